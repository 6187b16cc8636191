//! Parsers for panel files and sequencer sample sheets.

pub mod panel;
pub mod samplesheet;
pub mod util;

pub use panel::{parse_panel, RegionIndex};
pub use samplesheet::SampleSheet;
