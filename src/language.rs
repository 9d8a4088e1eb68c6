//! Per-language lexical rule tables and extension-based detection.

use std::path::Path;

use crate::block::BlockRule;

/// A supported source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    C,
    Cpp,
    Go,
    Java,
    JavaScript,
    Php,
    Python,
    Ruby,
    Rust,
    TypeScript,
}

impl Language {
    /// Ordered block rules for this language. String rules come first so
    /// that comment delimiters inside literals are never recognized; at
    /// each position the first matching rule wins.
    ///
    /// The rule list is built per call and handed to the pipeline by
    /// value; there is no process-wide rule table.
    pub fn rules(&self) -> Vec<BlockRule> {
        match self {
            Language::C | Language::Cpp | Language::Java => c_style(),
            Language::JavaScript | Language::TypeScript => {
                let mut rules = vec![BlockRule::string("`", "`", "\\")];
                rules.extend(c_style());
                rules
            }
            Language::Go => vec![
                BlockRule::string("`", "`", ""),
                BlockRule::string("\"", "\"", "\\"),
                BlockRule::string("'", "'", "\\"),
                BlockRule::multi_comment("/*", "*/", "*"),
                BlockRule::single_comment("//"),
            ],
            Language::Php => {
                let mut rules = c_style();
                rules.push(BlockRule::single_comment("#"));
                rules
            }
            Language::Python => vec![
                BlockRule::string("\"\"\"", "\"\"\"", ""),
                BlockRule::string("'''", "'''", ""),
                BlockRule::string("\"", "\"", "\\"),
                BlockRule::string("'", "'", "\\"),
                BlockRule::single_comment("#"),
            ],
            Language::Ruby => vec![
                BlockRule::string("\"", "\"", "\\"),
                BlockRule::string("'", "'", "\\"),
                BlockRule::multi_comment("=begin", "=end", ""),
                BlockRule::single_comment("#"),
            ],
            Language::Rust => vec![
                BlockRule::string("\"", "\"", "\\"),
                BlockRule::multi_comment("/*", "*/", "*"),
                BlockRule::single_comment("//"),
            ],
        }
    }

    /// Display name of the language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Go => "go",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Php => "php",
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
            Language::TypeScript => "typescript",
        }
    }
}

/// Shared rule table for the C family.
fn c_style() -> Vec<BlockRule> {
    vec![
        BlockRule::string("\"", "\"", "\\"),
        BlockRule::string("'", "'", "\\"),
        BlockRule::multi_comment("/*", "*/", "*"),
        BlockRule::single_comment("//"),
    ]
}

/// Detect the language of a file from its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?;
    match ext {
        "c" | "h" => Some(Language::C),
        "cc" | "cpp" | "cxx" | "hpp" => Some(Language::Cpp),
        "go" => Some(Language::Go),
        "java" => Some(Language::Java),
        "js" | "jsx" | "mjs" => Some(Language::JavaScript),
        "php" => Some(Language::Php),
        "py" => Some(Language::Python),
        "rb" => Some(Language::Ruby),
        "rs" => Some(Language::Rust),
        "ts" | "tsx" => Some(Language::TypeScript),
        _ => None,
    }
}

/// Check if a file has a supported extension.
pub fn is_supported_file(path: &Path) -> bool {
    detect_language(path).is_some()
}
