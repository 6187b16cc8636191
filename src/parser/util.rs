//! Utility functions for file parsing.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Creates a buffered reader that automatically handles gzip-compressed files.
///
/// Panels are routinely shipped as `.bed.gz`; anything else is read as plain text.
pub fn create_buffered_reader(file: File, path: &Path) -> Box<dyn BufRead + Send> {
    if path.to_string_lossy().ends_with(".gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    }
}

/// Sample name of an alignment file: the basename up to the first `_`.
pub fn sample_name_from_path(path: &Path) -> String {
    let basename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match basename.split_once('_') {
        Some((sample, _)) => sample.to_string(),
        None => basename,
    }
}
