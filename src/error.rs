//! Error types for panel loading, frequency extraction and sample sheets.
//!
//! All of these are fatal for the run that raises them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed panel line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Duplicate interval id '{id}' on panel line {line}")]
    DuplicateId { id: String, line: usize },
}

#[derive(Error, Debug)]
pub enum FrequencyError {
    #[error("The allele frequency cannot be retrieved in variant \"{site}\"")]
    NoFrequency { site: String },

    #[error("Variant \"{site}\" has {alleles} alternative alleles but {frequencies} frequencies")]
    AlleleCount {
        site: String,
        alleles: usize,
        frequencies: usize,
    },

    #[error("The depth for variant '{site}' already exists for sample '{sample}'")]
    DuplicateCoverage { sample: String, site: String },
}

#[derive(Error, Debug)]
pub enum SampleSheetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sample sheet has no [{0}] section")]
    MissingSection(&'static str),

    #[error("Sample sheet has no manifest '{0}'")]
    MissingManifest(String),
}
