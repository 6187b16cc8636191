//! Core data structures for amplikit.
//!
//! This module contains the panel interval type, strand orientation and the
//! read abstraction consumed by the matcher.

use std::fmt;
use std::str::FromStr;

/// Strand orientation for panel intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Positive,
    Negative,
}

/// Error type for parsing strand from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrandError;

impl fmt::Display for ParseStrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid strand: expected '+' or '-'")
    }
}

impl std::error::Error for ParseStrandError {}

impl FromStr for Strand {
    type Err = ParseStrandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Positive),
            "-" => Ok(Strand::Negative),
            _ => Err(ParseStrandError),
        }
    }
}

impl Strand {
    /// Convert strand to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Positive => "+",
            Strand::Negative => "-",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One primer/amplicon region of a panel.
///
/// Coordinates are 1-based and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub id: String,
    pub strand: Strand,
}

impl Interval {
    /// Create a new interval.
    pub fn new(chrom: String, start: i64, end: i64, id: String, strand: Strand) -> Self {
        Interval {
            chrom,
            start,
            end,
            id,
            strand,
        }
    }

    /// Get interval length (end - start + 1).
    pub fn length(&self) -> i64 {
        self.end - self.start + 1
    }
}

/// The view of an aligned read needed to assign it to a panel interval.
///
/// `reference_start` is 0-based, `reference_end` is 1-based inclusive
/// (equivalently 0-based exclusive).
pub trait AlignedRead {
    fn reference_start(&self) -> i64;
    fn reference_end(&self) -> i64;
    fn is_reverse(&self) -> bool;
    fn is_first_in_pair(&self) -> bool;
    fn is_paired(&self) -> bool;
    fn is_unmapped(&self) -> bool;
    fn is_mate_unmapped(&self) -> bool;
    fn is_secondary(&self) -> bool;
    fn query_name(&self) -> &[u8];
}

impl AlignedRead for rust_htslib::bam::Record {
    fn reference_start(&self) -> i64 {
        self.pos()
    }

    fn reference_end(&self) -> i64 {
        self.cigar().end_pos()
    }

    fn is_reverse(&self) -> bool {
        rust_htslib::bam::Record::is_reverse(self)
    }

    fn is_first_in_pair(&self) -> bool {
        self.is_first_in_template()
    }

    fn is_paired(&self) -> bool {
        rust_htslib::bam::Record::is_paired(self)
    }

    fn is_unmapped(&self) -> bool {
        rust_htslib::bam::Record::is_unmapped(self)
    }

    fn is_mate_unmapped(&self) -> bool {
        rust_htslib::bam::Record::is_mate_unmapped(self)
    }

    fn is_secondary(&self) -> bool {
        rust_htslib::bam::Record::is_secondary(self)
    }

    fn query_name(&self) -> &[u8] {
        self.qname()
    }
}

/// Classification of one primary read by the tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadClass<'a> {
    /// The read is not part of a pair.
    Unpaired,
    /// The read or its mate is unmapped.
    Unmapped,
    /// No panel interval anchors the read.
    OutTarget,
    /// An interval anchors the read but the orientation is wrong.
    CrossPanel(&'a Interval),
    /// The read comes from this interval.
    Valid(&'a Interval),
}
