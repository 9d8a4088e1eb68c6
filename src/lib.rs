//! # annodoc
//!
//! A library for extracting machine-readable annotation blocks from
//! source-code comments — across languages with different comment and
//! string lexical rules — and turning them into a validated API
//! documentation tree.
//!
//! Files are scanned in parallel by per-language lexical rules; the raw
//! comment blocks funnel through a bounded channel into a single builder
//! that deserializes annotations, enforces the domain invariants and
//! aggregates one document per group. Example payloads can be validated
//! against, or synthesized from, the declared parameter trees.
//!
//! ## Example
//!
//! ```rust,no_run
//! use annodoc::{builder, input, ErrorSink};
//!
//! let sink = ErrorSink::new();
//! let specs = input::collect(std::path::Path::new("src"), &sink).unwrap();
//! let docs = builder::parse(specs, &sink).unwrap();
//!
//! for (group, doc) in &docs {
//!     println!("{group}: {} apis", doc.apis.len());
//! }
//! for record in sink.records() {
//!     eprintln!("{}:{} {}", record.file.display(), record.line, record.message);
//! }
//! ```

pub mod block;
pub mod builder;
pub mod document;
pub mod error;
pub mod extractor;
pub mod input;
pub mod language;
pub mod lexer;
pub mod markup;
pub mod mock;
pub mod output;
pub mod scanner;

pub use block::{filter_symbols, BlockRule};
pub use builder::{parse, DocumentBuilder, DocumentSet};
pub use document::{
    Api, Callback, Document, EnumValue, Param, ParamType, Request, Version, DEFAULT_GROUP,
};
pub use error::{Error, ErrorRecord, ErrorSink, Result, Severity, SyntaxError};
pub use extractor::{extract, extract_all, SourceFile, SourceSpec};
pub use language::{detect_language, is_supported_file, Language};
pub use mock::{find, synthesize, synthesize_bytes, validate};
pub use output::{format_documents, format_records, OutputFormat};
pub use scanner::{scan, RawBlock};
