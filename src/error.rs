//! Error types and the shared error-record sink.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all annodoc operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {field}: {message}")]
    Config { field: String, message: String },

    #[error("failed to read file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file {} is not valid UTF-8", .path.display())]
    Decode { path: PathBuf },

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("unresolved reference `{reference}`")]
    Reference { reference: String, field: String },

    #[error("example does not match its declared type at {path}: {message}")]
    SchemaMismatch { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(field: &str, message: &str) -> Self {
        Self::Config {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// A per-block parse failure with enough locality to jump to the offending
/// source: file, line of the annotation block and the dotted field path of
/// the first violated invariant.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{}:{} {}: {}", .file.display(), .line, .field, .message)]
pub struct SyntaxError {
    pub file: PathBuf,
    pub line: usize,
    pub field: String,
    pub message: String,
}

impl SyntaxError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            file: PathBuf::new(),
            line: 0,
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Prefix the field path with an enclosing segment.
    pub fn in_field(mut self, parent: &str) -> Self {
        if self.field.is_empty() {
            self.field = parent.to_string();
        } else {
            self.field = format!("{}.{}", parent, self.field);
        }
        self
    }

    /// Attach the source location of the block the error came from.
    pub fn at(mut self, file: &std::path::Path, line: usize) -> Self {
        self.file = file.to_path_buf();
        self.line += line;
        self
    }
}

/// Severity of a reported record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single structured error record surfaced to the reporting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub severity: Severity,
    pub file: PathBuf,
    pub field: String,
    pub line: usize,
    pub message: String,
}

/// Shared collector for error records.
///
/// The sink is the side channel between the pipeline workers, the builder
/// and the caller: local failures are pushed here and never unwind across
/// file or block boundaries. Cloning shares the underlying collection.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    records: Arc<Mutex<Vec<ErrorRecord>>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, record: ErrorRecord) {
        self.records.lock().push(record);
    }

    pub fn error(&self, file: &std::path::Path, field: &str, line: usize, message: String) {
        self.report(ErrorRecord {
            severity: Severity::Error,
            file: file.to_path_buf(),
            field: field.to_string(),
            line,
            message,
        });
    }

    pub fn warning(&self, file: &std::path::Path, field: &str, line: usize, message: String) {
        self.report(ErrorRecord {
            severity: Severity::Warning,
            file: file.to_path_buf(),
            field: field.to_string(),
            line,
            message,
        });
    }

    pub fn syntax(&self, err: SyntaxError) {
        self.report(ErrorRecord {
            severity: Severity::Error,
            file: err.file,
            field: err.field,
            line: err.line,
            message: err.message,
        });
    }

    /// Number of records at error severity.
    pub fn error_count(&self) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.severity == Severity::Error)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drain all collected records.
    pub fn take(&self) -> Vec<ErrorRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Snapshot of the collected records.
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_syntax_error_field_nesting() {
        let err = SyntaxError::new("type", "required")
            .in_field("param")
            .in_field("response");
        assert_eq!(err.field, "response.param.type");
    }

    #[test]
    fn test_syntax_error_location() {
        let err = SyntaxError::new("method", "required").at(Path::new("a.rs"), 10);
        assert_eq!(err.file, PathBuf::from("a.rs"));
        assert_eq!(err.line, 10);
    }

    #[test]
    fn test_sink_is_shared_between_clones() {
        let sink = ErrorSink::new();
        let clone = sink.clone();
        clone.warning(Path::new("x.go"), "", 3, "unterminated string".to_string());
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.error_count(), 0);
    }

    #[test]
    fn test_sink_error_count() {
        let sink = ErrorSink::new();
        sink.error(Path::new("x.go"), "api.method", 1, "required".to_string());
        sink.warning(Path::new("x.go"), "", 2, "w".to_string());
        assert_eq!(sink.error_count(), 1);
    }
}
