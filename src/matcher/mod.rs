//! Matching logic for reads against panel intervals.

pub mod region;
pub mod strand;

pub use region::find_source_region;
pub use strand::has_valid_strand;

use crate::parser::RegionIndex;
use crate::types::{AlignedRead, ReadClass};

/// Classify one primary read against the panel.
///
/// `chrom` is the name of the read's reference sequence; it is ignored for
/// unpaired and unmapped reads.
pub fn classify_read<'a, R: AlignedRead + ?Sized>(
    read: &R,
    chrom: &str,
    index: &'a RegionIndex,
    anchor_offset: i64,
) -> ReadClass<'a> {
    if !read.is_paired() {
        return ReadClass::Unpaired;
    }
    if read.is_unmapped() || read.is_mate_unmapped() {
        return ReadClass::Unmapped;
    }

    let source = index
        .get(chrom)
        .and_then(|regions| find_source_region(read, regions, anchor_offset));

    match source {
        None => ReadClass::OutTarget,
        Some(region) if !has_valid_strand(read, region) => ReadClass::CrossPanel(region),
        Some(region) => ReadClass::Valid(region),
    }
}
