//! Amplicon panel parser with gzip support.
//!
//! Reads the BED file describing the amplicons with their primers and builds
//! the per-chromosome region index used by the read matcher.

use ahash::AHashMap;
use indexmap::IndexMap;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::error::PanelError;
use crate::parser::util::create_buffered_reader;
use crate::types::{Interval, Strand};

/// Panel intervals grouped by chromosome.
///
/// Chromosomes iterate in lexicographic order and each chromosome's intervals
/// are sorted by `(start, end)`. Interval ids are unique across the index.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    by_chrom: IndexMap<String, Vec<Interval>>,
}

impl RegionIndex {
    /// Build the index from an unordered list of intervals.
    ///
    /// The sort is stable, so intervals with identical coordinates keep their
    /// file order.
    pub fn from_intervals(mut intervals: Vec<Interval>) -> Self {
        intervals.sort_by(|a, b| {
            a.chrom
                .cmp(&b.chrom)
                .then(a.start.cmp(&b.start))
                .then(a.end.cmp(&b.end))
        });

        let mut by_chrom: IndexMap<String, Vec<Interval>> = IndexMap::new();
        for interval in intervals {
            by_chrom
                .entry(interval.chrom.clone())
                .or_default()
                .push(interval);
        }
        RegionIndex { by_chrom }
    }

    /// Sorted intervals for a chromosome, if the panel has any there.
    pub fn get(&self, chrom: &str) -> Option<&[Interval]> {
        self.by_chrom.get(chrom).map(Vec::as_slice)
    }

    /// Chromosome names in index order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.by_chrom.keys().map(String::as_str)
    }

    /// All intervals, chromosome by chromosome, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Interval> {
        self.by_chrom.values().flatten()
    }

    /// Total number of intervals.
    pub fn len(&self) -> usize {
        self.by_chrom.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chrom.is_empty()
    }
}

/// Parse a panel BED file (plain or `.gz`) into a [`RegionIndex`].
pub fn parse_panel(path: &Path) -> Result<RegionIndex, PanelError> {
    let file = File::open(path)?;
    let reader = create_buffered_reader(file, path);

    parse_panel_reader(reader)
}

/// Parse panel data from a reader.
pub fn parse_panel_reader<R: BufRead>(reader: R) -> Result<RegionIndex, PanelError> {
    let mut intervals = Vec::new();
    // id -> line where it was first seen
    let mut seen_ids: AHashMap<String, usize> = AHashMap::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let line_number = idx + 1;

        if is_header_line(&line) || line.trim().is_empty() {
            continue;
        }

        let interval = parse_line(&line, line_number)?;

        if seen_ids.contains_key(&interval.id) {
            return Err(PanelError::DuplicateId {
                id: interval.id,
                line: line_number,
            });
        }
        seen_ids.insert(interval.id.clone(), line_number);
        intervals.push(interval);
    }

    Ok(RegionIndex::from_intervals(intervals))
}

fn is_header_line(line: &str) -> bool {
    line.starts_with("browser ") || line.starts_with("track ") || line.starts_with('#')
}

/// Parse one data line: chrom, 0-based start, end, id, score, strand.
fn parse_line(line: &str, line_number: usize) -> Result<Interval, PanelError> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();

    if fields.len() < 6 {
        return Err(PanelError::Malformed {
            line: line_number,
            reason: format!("expected at least 6 fields, found {}", fields.len()),
        });
    }

    let start: i64 = fields[1].parse().map_err(|_| PanelError::Malformed {
        line: line_number,
        reason: format!("start '{}' is not an integer", fields[1]),
    })?;
    let end: i64 = fields[2].parse().map_err(|_| PanelError::Malformed {
        line: line_number,
        reason: format!("end '{}' is not an integer", fields[2]),
    })?;
    let strand: Strand = fields[5].parse().map_err(|e| PanelError::Malformed {
        line: line_number,
        reason: format!("{} (found '{}')", e, fields[5]),
    })?;

    Ok(Interval::new(
        fields[0].to_string(),
        start + 1, // BED start is 0-based
        end,
        fields[3].to_string(),
        strand,
    ))
}
