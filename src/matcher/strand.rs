//! Strand concordance between a read and the amplicon it was assigned to.

use crate::types::{AlignedRead, Interval, Strand};

/// True if the read is oriented as if it was amplified from `region`.
///
/// Read 1 follows the primer strand, read 2 is its reverse complement.
pub fn has_valid_strand<R: AlignedRead + ?Sized>(read: &R, region: &Interval) -> bool {
    let expected = match (read.is_first_in_pair(), read.is_reverse()) {
        (true, true) => Strand::Negative,
        (true, false) => Strand::Positive,
        (false, true) => Strand::Positive,
        (false, false) => Strand::Negative,
    };
    region.strand == expected
}
