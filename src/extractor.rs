//! Parallel extraction pipeline: fan out file scans, funnel raw blocks.

use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread;

use rayon::prelude::*;

use crate::block::BlockRule;
use crate::error::{Error, ErrorSink, Result};
use crate::scanner::{scan, RawBlock};

/// Capacity of the raw-block channel between the scanners and the builder.
/// Producers block when it is full, the consumer blocks when it is empty.
const BLOCK_CHANNEL_CAPACITY: usize = 500;

/// One already-decoded source buffer, tagged with the path it came from.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
        }
    }
}

/// A group of files sharing one resolved rule list.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub rules: Vec<BlockRule>,
    pub files: Vec<SourceFile>,
}

/// Reject an empty or structurally invalid spec collection. Runs before
/// any work is scheduled; a violation is fatal.
fn sanitize(specs: &[SourceSpec]) -> Result<()> {
    if specs.is_empty() {
        return Err(Error::config("specs", "must not be empty"));
    }
    for (index, spec) in specs.iter().enumerate() {
        if spec.rules.is_empty() {
            return Err(Error::config(
                &format!("specs[{index}].rules"),
                "must not be empty",
            ));
        }
        if spec.files.is_empty() {
            return Err(Error::config(
                &format!("specs[{index}].files"),
                "must not be empty",
            ));
        }
    }
    Ok(())
}

/// Start the extraction pipeline and return the block stream.
///
/// Every file is scanned independently and in parallel; scanning one file
/// is strictly sequential internally. Blocks from all files funnel into
/// the returned bounded channel with no cross-file ordering; within one
/// file the relative order of that file's blocks is preserved. The channel
/// closes only after every file scan has finished, which is the completion
/// barrier downstream consumers wait on before treating the collection as
/// final.
///
/// Scan warnings go to `sink` and never abort sibling scans.
pub fn extract(specs: Vec<SourceSpec>, sink: &ErrorSink) -> Result<Receiver<RawBlock>> {
    sanitize(&specs)?;

    let (tx, rx) = sync_channel(BLOCK_CHANNEL_CAPACITY);
    let sink = sink.clone();

    thread::spawn(move || {
        specs.par_iter().for_each_with(tx, |tx, spec| {
            spec.files.par_iter().for_each_with(tx.clone(), |tx, file| {
                for block in scan(&file.path, &file.data, &spec.rules, &sink) {
                    // A send error means the receiver is gone; stop quietly.
                    if tx.send(block).is_err() {
                        return;
                    }
                }
            });
        });
        // All senders dropped here: the channel closes and the barrier
        // passes.
    });

    Ok(rx)
}

/// Run the pipeline to completion and collect every block.
pub fn extract_all(specs: Vec<SourceSpec>, sink: &ErrorSink) -> Result<Vec<RawBlock>> {
    Ok(extract(specs, sink)?.into_iter().collect())
}
