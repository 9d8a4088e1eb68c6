//! Scan one decoded buffer into raw comment blocks.

use std::path::{Path, PathBuf};

use crate::block::BlockRule;
use crate::error::ErrorSink;
use crate::lexer::Lexer;

/// Filtered text of one or more adjacent same-style comments, tagged with
/// its source location. Produced once by the scanner, consumed once by the
/// builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub path: PathBuf,
    /// 1-based line of the begin-token match.
    pub line: usize,
    /// Filtered content, per-line chunks joined.
    pub data: Vec<u8>,
    /// The block as it appears in the source, delimiters included.
    pub raw: Vec<u8>,
}

/// Scan `data` with the given ordered rule list.
///
/// At each position the rules are tried in declaration order and the first
/// whose begin token matches wins; string rules are consumed but never
/// emitted, comment rules yield one candidate block each. When no rule
/// matches the cursor advances one byte. Unterminated string literals and
/// multi-line comments are reported as warnings and abandoned; they never
/// produce partial blocks.
///
/// Scanning is strictly sequential within one buffer.
pub fn scan(path: &Path, data: &[u8], rules: &[BlockRule], sink: &ErrorSink) -> Vec<RawBlock> {
    let mut l = Lexer::new(data);
    let mut blocks = Vec::new();

    'scan: while !l.at_eof() {
        let begin = l.pos();
        for rule in rules {
            if !rule.begin_match(&mut l) {
                continue;
            }
            match rule.end(&mut l) {
                Some(lines) => {
                    if rule.emits() && !lines.is_empty() {
                        blocks.push(RawBlock {
                            path: path.to_path_buf(),
                            line: l.line_of(begin),
                            data: lines.concat(),
                            raw: l.slice(begin, l.pos()).to_vec(),
                        });
                    }
                }
                None => {
                    let what = if rule.emits() {
                        "unterminated comment"
                    } else {
                        "unterminated string literal"
                    };
                    sink.warning(path, "", l.line_of(begin), what.to_string());
                }
            }
            continue 'scan;
        }
        l.advance(1);
    }

    blocks
}
