//! Render documents and error reports for the CLI.

use colored::Colorize;

use crate::builder::DocumentSet;
use crate::error::{ErrorRecord, Severity};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

/// Format the document set as a string.
pub fn format_documents(docs: &DocumentSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(docs).unwrap_or_default(),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(docs).unwrap_or_default(),
        OutputFormat::Text => format_documents_text(docs),
    }
}

fn format_documents_text(docs: &DocumentSet) -> String {
    let mut output = String::new();

    for (group, doc) in docs {
        let title = if doc.title.is_empty() {
            "(untitled)"
        } else {
            doc.title.as_str()
        };
        output.push_str(&format!(
            "{} {} — {} apis\n",
            group.bold(),
            title,
            doc.apis.len()
        ));
        for api in &doc.apis {
            output.push_str(&format!("  {} {}\n", api.method, api.path));
        }
        if !doc.valid {
            output.push_str(&format!("  {}\n", "document has unresolved references".red()));
        }
    }

    output
}

/// Format collected error records as a string.
pub fn format_records(records: &[ErrorRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(records).unwrap_or_default(),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(records).unwrap_or_default(),
        OutputFormat::Text => format_records_text(records),
    }
}

fn format_records_text(records: &[ErrorRecord]) -> String {
    let mut output = String::new();

    for record in records {
        let severity = match record.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN".yellow().bold(),
            Severity::Info => "INFO".blue(),
        };

        let location = format!("{}:{}", record.file.display(), record.line);
        if record.field.is_empty() {
            output.push_str(&format!("{severity} {location} {}\n", record.message));
        } else {
            output.push_str(&format!(
                "{severity} {location} {} {}\n",
                record.field.cyan(),
                record.message
            ));
        }
    }

    if records.is_empty() {
        output.push_str("no problems found\n");
    }

    output
}
