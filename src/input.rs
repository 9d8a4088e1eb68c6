//! Assemble pipeline input from the filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{Error, ErrorSink, Result};
use crate::extractor::{SourceFile, SourceSpec};
use crate::language::{detect_language, is_supported_file, Language};

/// Walk `root` and build one source spec per detected language.
///
/// Files with unsupported extensions are skipped. Reading and decoding
/// happen in parallel; an unreadable or non-UTF-8 file is reported to the
/// sink and dropped, never affecting its siblings. `root` may also name a
/// single file.
pub fn collect(root: &Path, sink: &ErrorSink) -> Result<Vec<SourceSpec>> {
    if root.is_file() && !is_supported_file(root) {
        return Err(Error::UnsupportedFileType(root.display().to_string()));
    }

    let mut candidates: Vec<(PathBuf, Language)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(language) = detect_language(entry.path()) {
            candidates.push((entry.into_path(), language));
        }
    }

    let loaded: Vec<(Language, SourceFile)> = candidates
        .into_par_iter()
        .filter_map(|(path, language)| match read_source(&path) {
            Ok(file) => Some((language, file)),
            Err(err) => {
                sink.error(&path, "", 0, err.to_string());
                None
            }
        })
        .collect();

    let mut by_language: BTreeMap<Language, Vec<SourceFile>> = BTreeMap::new();
    for (language, file) in loaded {
        by_language.entry(language).or_default().push(file);
    }

    Ok(by_language
        .into_iter()
        .map(|(language, files)| SourceSpec {
            rules: language.rules(),
            files,
        })
        .collect())
}

/// Read one file and require valid UTF-8.
fn read_source(path: &Path) -> Result<SourceFile> {
    let data = std::fs::read(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    if std::str::from_utf8(&data).is_err() {
        return Err(Error::Decode {
            path: path.to_path_buf(),
        });
    }

    Ok(SourceFile::new(path, data))
}
