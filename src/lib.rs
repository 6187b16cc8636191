//! amplikit - amplicon sequencing pipeline tools.
//!
//! This library provides the building blocks of three operational commands
//! used around a clinical amplicon-sequencing pipeline:
//!
//! - Tag reads with the amplicon (primer pair) they were amplified from,
//!   based on where their 5' end anchors relative to the panel primers
//! - Build per-sample allele frequency and coverage tables from variant
//!   calls and alignments
//! - Watch a sequencer output folder and launch the annotation workflows
//!   when a run completes
//!
//! # Example
//!
//! ```ignore
//! use amplikit::config::TaggingConfig;
//! use amplikit::parser::parse_panel;
//! use amplikit::tagging::tag_alignments;
//! use std::path::Path;
//!
//! let config = TaggingConfig::default();
//! let panel = parse_panel(Path::new("panel.bed"))?;
//! let counts = tag_alignments(
//!     Path::new("sample.bam"),
//!     Path::new("sample_tagged.bam"),
//!     &panel,
//!     &config,
//!     1,
//! )?;
//! println!("{} valid reads in pairs", counts.valid_in_pair);
//! ```

pub mod autorun;
pub mod config;
pub mod error;
pub mod frequency;
pub mod matcher;
pub mod output;
pub mod parser;
pub mod tagging;
pub mod types;

pub use config::{AutorunConfig, TaggingConfig};
pub use error::{FrequencyError, PanelError, SampleSheetError};
pub use parser::{RegionIndex, SampleSheet};
pub use types::{AlignedRead, Interval, ReadClass, Strand};
