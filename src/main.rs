//! CLI entry point: build, extract and check commands.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use annodoc::{builder, extractor, input, output, Error, ErrorSink, OutputFormat};

#[derive(Parser)]
#[command(name = "annodoc")]
#[command(
    author,
    version,
    about = "Extract API documentation from source-code annotations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build documentation from annotations under a path
    Build {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format for the documents
        #[arg(long, short, value_enum, default_value = "json-pretty")]
        format: Format,
    },

    /// Dump the raw comment blocks found under a path
    Extract {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Check annotations and report problems without emitting documents
    Check {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format for the report
        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { path, format } => {
            let sink = ErrorSink::new();
            match collect_and_parse(&path, &sink) {
                Ok(docs) => {
                    println!("{}", output::format_documents(&docs, format.into()));
                    let records = sink.records();
                    if !records.is_empty() {
                        eprint!("{}", output::format_records(&records, OutputFormat::Text));
                    }
                    exit_for(&sink)
                }
                Err(e) => fatal(e),
            }
        }

        Commands::Extract { path } => {
            let sink = ErrorSink::new();
            let blocks = input::collect(&path, &sink)
                .and_then(|specs| extractor::extract_all(specs, &sink));
            match blocks {
                Ok(blocks) => {
                    for block in &blocks {
                        println!("{}:{}", block.path.display(), block.line);
                        println!("{}", String::from_utf8_lossy(&block.data));
                    }
                    exit_for(&sink)
                }
                Err(e) => fatal(e),
            }
        }

        Commands::Check { path, format } => {
            let sink = ErrorSink::new();
            match collect_and_parse(&path, &sink) {
                Ok(_) => {
                    println!(
                        "{}",
                        output::format_records(&sink.records(), format.into())
                    );
                    exit_for(&sink)
                }
                Err(e) => fatal(e),
            }
        }
    }
}

fn collect_and_parse(path: &PathBuf, sink: &ErrorSink) -> annodoc::Result<builder::DocumentSet> {
    let specs = input::collect(path, sink)?;
    builder::parse(specs, sink)
}

fn exit_for(sink: &ErrorSink) -> ExitCode {
    if sink.error_count() > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn fatal(e: Error) -> ExitCode {
    eprintln!("Error: {e}");
    ExitCode::from(2)
}
