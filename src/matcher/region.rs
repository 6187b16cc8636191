//! Read-to-amplicon assignment.
//!
//! A read comes from an amplicon when its 5' end lines up with the primer
//! start, within `anchor_offset` bases of slop for mismatches on the first
//! sequenced positions.

use crate::types::{AlignedRead, Interval};

/// Return the interval the read originates from, or `None`.
///
/// `regions` must be the sorted interval list of the read's chromosome. The
/// scan stops as soon as the read's anchor lies before an interval start,
/// since no later interval can match. When intervals overlap, the first
/// eligible one in sorted order wins.
pub fn find_source_region<'a, R: AlignedRead + ?Sized>(
    read: &R,
    regions: &'a [Interval],
    anchor_offset: i64,
) -> Option<&'a Interval> {
    if read.is_reverse() {
        let ref_end = read.reference_end();
        for region in regions {
            if ref_end < region.start {
                break;
            }
            if ref_end <= region.end && ref_end >= region.end - anchor_offset {
                return Some(region);
            }
        }
    } else {
        let ref_start = read.reference_start() + 1;
        for region in regions {
            if ref_start < region.start {
                break;
            }
            if ref_start <= region.start + anchor_offset {
                return Some(region);
            }
        }
    }
    None
}
