//! Lexical block rules: string literals, single-line and multi-line comments.

use crate::lexer::Lexer;

/// One per-language lexical rule.
///
/// The variant set is closed: every language in the registry is described
/// by some ordered combination of these three rules. String rules exist
/// only to keep comment delimiters inside literals from being recognized;
/// their content is consumed but never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRule {
    /// String literal with an optional escape token.
    Str {
        begin: String,
        end: String,
        escape: String,
    },
    /// Single-line comment. Adjacent lines sharing the same begin token
    /// merge into one block; `filter` strips doc-comment gutters.
    SingleComment { begin: String, filter: String },
    /// Multi-line comment. Never merged with a neighboring block; `filter`
    /// strips the leading gutter (e.g. `*`) from each content line.
    MultiComment {
        begin: String,
        end: String,
        filter: String,
    },
}

impl BlockRule {
    pub fn string(begin: &str, end: &str, escape: &str) -> Self {
        Self::Str {
            begin: begin.to_string(),
            end: end.to_string(),
            escape: escape.to_string(),
        }
    }

    /// Single-line comment rule. The begin token's final byte doubles as
    /// the line filter so that `///` or `##` gutters collapse to content.
    pub fn single_comment(begin: &str) -> Self {
        let filter = begin
            .chars()
            .next_back()
            .map(String::from)
            .unwrap_or_default();
        Self::SingleComment {
            begin: begin.to_string(),
            filter,
        }
    }

    pub fn multi_comment(begin: &str, end: &str, filter: &str) -> Self {
        Self::MultiComment {
            begin: begin.to_string(),
            end: end.to_string(),
            filter: filter.to_string(),
        }
    }

    /// Whether a successful match produces a comment block. String rules
    /// are swallowed silently.
    pub fn emits(&self) -> bool {
        !matches!(self, Self::Str { .. })
    }

    /// Check whether the lexer's position matches this rule's begin token,
    /// consuming it on success.
    pub fn begin_match(&self, l: &mut Lexer) -> bool {
        let begin = match self {
            Self::Str { begin, .. }
            | Self::SingleComment { begin, .. }
            | Self::MultiComment { begin, .. } => begin,
        };
        l.try_match(begin)
    }

    /// Scan from the current position to the end of the block. Returns the
    /// content split into filtered per-line chunks, or None when the end
    /// token is missing before EOF ("unterminated"); an unterminated block
    /// is abandoned, never partially emitted.
    pub fn end(&self, l: &mut Lexer) -> Option<Vec<Vec<u8>>> {
        match self {
            Self::Str { end, escape, .. } => end_string(l, end, escape),
            Self::SingleComment { begin, filter } => end_single_comment(l, begin, filter),
            Self::MultiComment { end, filter, .. } => end_multi_comment(l, end, filter),
        }
    }
}

/// Scan to the closing delimiter of a string literal. The content payload
/// is always empty; only the consumed span matters.
fn end_string(l: &mut Lexer, end: &str, escape: &str) -> Option<Vec<Vec<u8>>> {
    loop {
        if l.at_eof() {
            return None;
        }
        if !escape.is_empty() && l.try_match(escape) {
            l.advance(1);
            continue;
        }
        if l.try_match(end) {
            return Some(Vec::new());
        }
        l.advance(1);
    }
}

/// Accumulate adjacent same-style single-line comments into one block.
///
/// After each line the lexer probes for the begin token again, skipping
/// same-line whitespace only; on a match the next line folds into the
/// block. The final probing byte is handed back to the lexer. Succeeds
/// even at EOF, with the partial final line included.
fn end_single_comment(l: &mut Lexer, begin: &str, filter: &str) -> Option<Vec<Vec<u8>>> {
    let mut lines = Vec::new();

    'block: loop {
        let start = l.pos();
        loop {
            match l.next_byte() {
                None => {
                    if l.pos() > start {
                        lines.push(filter_symbols(l.slice(start, l.pos()), filter));
                    }
                    break 'block;
                }
                Some(b'\n') => {
                    lines.push(filter_symbols(l.slice(start, l.pos()), filter));
                    break;
                }
                Some(_) => {}
            }
        }

        l.skip_space(false);
        if !l.try_match(begin) {
            break;
        }
    }

    if !lines.is_empty() {
        // Return the trailing byte consumed while probing for continuation.
        l.backup();
    }

    Some(lines)
}

/// Scan to the end token of a multi-line comment, splitting the content at
/// newlines and filtering each chunk. A residual partial chunk before the
/// end token is flushed only when non-empty.
fn end_multi_comment(l: &mut Lexer, end: &str, filter: &str) -> Option<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    let mut start = l.pos();

    loop {
        if l.at_eof() {
            return None;
        }
        if l.try_match(end) {
            let content_end = l.pos() - end.len();
            if content_end > start {
                lines.push(filter_symbols(l.slice(start, content_end), filter));
            }
            return Some(lines);
        }
        if l.next_byte() == Some(b'\n') {
            lines.push(filter_symbols(l.slice(start, l.pos()), filter));
            start = l.pos();
        }
    }
}

/// Strip one leading gutter marker from a line.
///
/// Leading non-newline whitespace is skipped; when the first non-space byte
/// is in `charset` it is dropped together with at most one following space
/// (a following newline collapses the whole line to just the newline). A
/// leading byte outside the charset leaves the line unmodified. An empty
/// charset is the identity.
pub fn filter_symbols(line: &[u8], charset: &str) -> Vec<u8> {
    if charset.is_empty() {
        return line.to_vec();
    }

    for (index, &b) in line.iter().enumerate() {
        if b.is_ascii_whitespace() && b != b'\n' {
            continue;
        }
        if !charset.as_bytes().contains(&b) {
            return line.to_vec();
        }
        return match line.get(index + 1) {
            Some(b'\n') => vec![b'\n'],
            Some(next) if next.is_ascii_whitespace() => line[index + 2..].to_vec(),
            _ => line[index + 1..].to_vec(),
        };
    }

    line.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: &BlockRule, input: &str) -> Option<Vec<String>> {
        let mut l = Lexer::new(input.as_bytes());
        assert!(rule.begin_match(&mut l), "begin token must match");
        rule.end(&mut l).map(|lines| {
            lines
                .into_iter()
                .map(|v| String::from_utf8(v).unwrap())
                .collect()
        })
    }

    #[test]
    fn test_string_terminated() {
        let rule = BlockRule::string("\"", "\"", "\\");
        assert_eq!(run(&rule, "\"abc\" rest"), Some(vec![]));
    }

    #[test]
    fn test_string_with_escape() {
        let rule = BlockRule::string("\"", "\"", "\\");
        let mut l = Lexer::new(b"\"a\\\"b\"x");
        assert!(rule.begin_match(&mut l));
        assert!(rule.end(&mut l).is_some());
        assert_eq!(l.peek(), Some(b'x'));
    }

    #[test]
    fn test_string_unterminated() {
        let rule = BlockRule::string("\"", "\"", "\\");
        assert_eq!(run(&rule, "\"never ends"), None);
    }

    #[test]
    fn test_single_comment_one_line() {
        let rule = BlockRule::single_comment("//");
        let lines = run(&rule, "// hello\ncode();").unwrap();
        assert_eq!(lines, vec![" hello\n"]);
    }

    #[test]
    fn test_single_comment_merges_adjacent_lines() {
        let rule = BlockRule::single_comment("//");
        let lines = run(&rule, "// a\n// b\ncode();").unwrap();
        assert_eq!(lines, vec![" a\n", " b\n"]);
    }

    #[test]
    fn test_single_comment_merges_indented_continuation() {
        let rule = BlockRule::single_comment("//");
        let lines = run(&rule, "// a\n    // b\nx").unwrap();
        assert_eq!(lines, vec![" a\n", " b\n"]);
    }

    #[test]
    fn test_single_comment_blank_line_breaks_merge() {
        let rule = BlockRule::single_comment("//");
        let lines = run(&rule, "// a\n\n// b\n").unwrap();
        assert_eq!(lines, vec![" a\n"]);
    }

    #[test]
    fn test_single_comment_succeeds_at_eof() {
        let rule = BlockRule::single_comment("//");
        let lines = run(&rule, "// last").unwrap();
        assert_eq!(lines, vec![" last"]);
    }

    #[test]
    fn test_single_comment_doc_gutter_filtered() {
        // After "//" is consumed, "/// doc" leaves "/ doc"; the implicit
        // "/" filter strips the gutter.
        let rule = BlockRule::single_comment("//");
        let lines = run(&rule, "/// doc\nx").unwrap();
        assert_eq!(lines, vec!["doc\n"]);
    }

    #[test]
    fn test_single_comment_returns_probe_byte() {
        let rule = BlockRule::single_comment("//");
        let mut l = Lexer::new(b"// a\nnext");
        assert!(rule.begin_match(&mut l));
        rule.end(&mut l).unwrap();
        // The byte consumed while probing is returned for rescanning.
        assert!(!l.at_eof());
    }

    #[test]
    fn test_multi_comment_basic() {
        let rule = BlockRule::multi_comment("/*", "*/", "*");
        let lines = run(&rule, "/* a\n * b\n */x").unwrap();
        assert_eq!(lines, vec![" a\n", "b\n", " "]);
    }

    #[test]
    fn test_multi_comment_single_line() {
        let rule = BlockRule::multi_comment("/*", "*/", "*");
        let lines = run(&rule, "/* inline */x").unwrap();
        assert_eq!(lines, vec![" inline "]);
    }

    #[test]
    fn test_multi_comment_empty_body() {
        let rule = BlockRule::multi_comment("/*", "*/", "*");
        let lines = run(&rule, "/**/x").unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn test_multi_comment_unterminated() {
        let rule = BlockRule::multi_comment("/*", "*/", "*");
        assert_eq!(run(&rule, "/* never ends"), None);
    }

    #[test]
    fn test_filter_symbols_empty_charset_is_identity() {
        assert_eq!(filter_symbols(b"  * text\n", ""), b"  * text\n".to_vec());
    }

    #[test]
    fn test_filter_symbols_strips_marker_and_space() {
        assert_eq!(filter_symbols(b" * text\n", "*"), b"text\n".to_vec());
    }

    #[test]
    fn test_filter_symbols_marker_without_space() {
        assert_eq!(filter_symbols(b"*text\n", "*"), b"text\n".to_vec());
    }

    #[test]
    fn test_filter_symbols_marker_then_newline_collapses() {
        assert_eq!(filter_symbols(b"   *\n", "*"), b"\n".to_vec());
    }

    #[test]
    fn test_filter_symbols_leading_byte_not_in_charset() {
        assert_eq!(filter_symbols(b"  text\n", "*"), b"  text\n".to_vec());
    }

    #[test]
    fn test_filter_symbols_removes_at_most_one_marker() {
        assert_eq!(filter_symbols(b"** text\n", "*"), b"* text\n".to_vec());
    }
}
