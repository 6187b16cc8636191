//! Tagging of reads with the amplicon they come from.
//!
//! Reads are classified one by one against the panel, valid reads get a
//! read-group id pointing to their amplicon, and only reads whose mate is also
//! valid are kept.

pub mod bam;

use ahash::AHashMap;

use crate::parser::RegionIndex;
use crate::types::ReadClass;

pub use bam::tag_alignments;

/// Counters reported at the end of a tagging run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagCounts {
    /// Primary reads processed.
    pub total: u64,
    pub unpaired: u64,
    pub unmapped: u64,
    pub out_target: u64,
    pub cross_panel: u64,
    /// Reads assigned to an amplicon with a concordant strand.
    pub valid: u64,
    /// Valid reads whose mate was valid too.
    pub valid_in_pair: u64,
}

impl TagCounts {
    /// Count one primary read.
    pub fn record(&mut self, class: &ReadClass<'_>) {
        self.total += 1;
        match class {
            ReadClass::Unpaired => self.unpaired += 1,
            ReadClass::Unmapped => self.unmapped += 1,
            ReadClass::OutTarget => self.out_target += 1,
            ReadClass::CrossPanel(_) => self.cross_panel += 1,
            ReadClass::Valid(_) => self.valid += 1,
        }
    }

    /// `count / total`, or 0 when nothing was processed.
    pub fn ratio(&self, count: u64) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }
}

/// What the pair buffer wants written after a valid read was pushed.
#[derive(Debug, PartialEq, Eq)]
pub enum PairEmit<T> {
    /// First mate seen; held until its mate shows up.
    Buffered,
    /// Second mate seen: write the held mate then this one.
    Pair(T, T),
    /// The pair was already written; write this read alone.
    Late(T),
}

/// Holds valid reads by query name until their mate is valid too.
#[derive(Debug)]
pub struct PairBuffer<T> {
    // None once the pair has been emitted
    pending: AHashMap<Vec<u8>, Option<T>>,
}

impl<T> Default for PairBuffer<T> {
    fn default() -> Self {
        PairBuffer {
            pending: AHashMap::new(),
        }
    }
}

impl<T> PairBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a valid read.
    pub fn push(&mut self, name: &[u8], read: T) -> PairEmit<T> {
        match self.pending.get_mut(name) {
            Some(slot) => match slot.take() {
                Some(mate) => PairEmit::Pair(mate, read),
                None => PairEmit::Late(read),
            },
            None => {
                self.pending.insert(name.to_vec(), Some(read));
                PairEmit::Buffered
            }
        }
    }

    /// Number of valid reads still waiting for their mate.
    pub fn orphans(&self) -> usize {
        self.pending.values().filter(|slot| slot.is_some()).count()
    }
}

/// Read-group ids assigned to the panel intervals.
///
/// Ids are `1..=n` following the index order, one `@RG` line per interval.
#[derive(Debug, Clone)]
pub struct ReadGroups {
    id_by_interval: AHashMap<String, String>,
    header_lines: Vec<String>,
}

impl ReadGroups {
    pub fn new(index: &RegionIndex, rg_tag: &str) -> Self {
        let mut id_by_interval = AHashMap::new();
        let mut header_lines = Vec::with_capacity(index.len());

        for (idx, interval) in index.iter().enumerate() {
            let rg_id = (idx + 1).to_string();
            header_lines.push(format!("@RG\tID:{}\t{}:{}", rg_id, rg_tag, interval.id));
            id_by_interval.insert(interval.id.clone(), rg_id);
        }

        ReadGroups {
            id_by_interval,
            header_lines,
        }
    }

    /// Read-group id of an interval.
    pub fn id_of(&self, interval_id: &str) -> Option<&str> {
        self.id_by_interval.get(interval_id).map(String::as_str)
    }

    /// Replace every `@RG` line of a SAM header text by the panel read groups.
    ///
    /// The new lines go where `@RG` lines belong: after `@HD`/`@SQ` and before
    /// `@PG`/`@CO`.
    pub fn rewrite_header(&self, header_text: &str) -> String {
        let mut out = String::with_capacity(header_text.len());
        let mut inserted = false;

        for line in header_text.lines() {
            if line.is_empty() || line.starts_with("@RG") {
                continue;
            }
            if !inserted && (line.starts_with("@PG") || line.starts_with("@CO")) {
                self.push_lines(&mut out);
                inserted = true;
            }
            out.push_str(line);
            out.push('\n');
        }
        if !inserted {
            self.push_lines(&mut out);
        }
        out
    }

    fn push_lines(&self, out: &mut String) {
        for line in &self.header_lines {
            out.push_str(line);
            out.push('\n');
        }
    }
}
