//! Per-position read depth from indexed alignment files.
//!
//! Depth follows `samtools depth -aa`: unmapped, secondary, QC-fail and
//! duplicate reads are ignored, deletions and reference skips do not count,
//! and positions without coverage report 0.

use anyhow::{Context, Result};
use rayon::prelude::*;
use rust_htslib::bam::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::frequency::{site_id, VariantTable};
use crate::parser::util::sample_name_from_path;

/// Reads excluded from depth: unmapped, secondary, QC fail, duplicate.
pub const DEPTH_EXCLUDE_FLAGS: u16 = 0x4 | 0x100 | 0x200 | 0x400;

/// Pileup depth cap.
pub const MAX_DEPTH: u32 = 1_000_000;

/// Anything able to report the read depth at a 1-based position.
pub trait DepthSource {
    fn depth_at(&mut self, chrom: &str, pos: i64) -> Result<u32>;
}

/// Depth from an indexed BAM file.
pub struct BamDepth {
    reader: bam::IndexedReader,
    path: PathBuf,
}

impl BamDepth {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = bam::IndexedReader::from_path(path)
            .with_context(|| format!("Failed to open indexed alignment file: {}", path.display()))?;
        Ok(BamDepth {
            reader,
            path: path.to_path_buf(),
        })
    }
}

impl DepthSource for BamDepth {
    fn depth_at(&mut self, chrom: &str, pos: i64) -> Result<u32> {
        if self.reader.header().tid(chrom.as_bytes()).is_none() {
            return Ok(0);
        }
        self.reader
            .fetch((chrom, pos - 1, pos))
            .with_context(|| format!("Failed to fetch {}:{} in {}", chrom, pos, self.path.display()))?;

        let target = (pos - 1) as u32;
        let mut pileups = self.reader.pileup();
        pileups.set_max_depth(MAX_DEPTH);

        for pileup in pileups {
            let pileup = pileup.context("Failed to build pileup")?;
            if pileup.pos() < target {
                continue;
            }
            if pileup.pos() > target {
                break;
            }
            let depth = pileup
                .alignments()
                .filter(|alignment| {
                    !alignment.is_del()
                        && !alignment.is_refskip()
                        && alignment.record().flags() & DEPTH_EXCLUDE_FLAGS == 0
                })
                .count();
            return Ok(depth as u32);
        }
        Ok(0)
    }
}

/// Depth of one source at every position, keyed by site id.
pub fn measure_positions<S: DepthSource>(
    source: &mut S,
    positions: &[(String, i64)],
) -> Result<Vec<(String, u32)>> {
    positions
        .iter()
        .map(|(chrom, pos)| Ok((site_id(chrom, *pos), source.depth_at(chrom, *pos)?)))
        .collect()
}

/// Measure the depth of every alignment file at every site of the table.
///
/// Files are processed in parallel; results are stored in file order so a
/// repeated sample name is reported deterministically. Returns the sample
/// names in file order.
pub fn collect_coverage(aln_files: &[PathBuf], table: &mut VariantTable) -> Result<Vec<String>> {
    let positions = table.positions();

    let measured: Vec<Result<(String, Vec<(String, u32)>)>> = aln_files
        .par_iter()
        .map(|path| {
            let sample = sample_name_from_path(path);
            let mut source = BamDepth::open(path)?;
            let depths = measure_positions(&mut source, &positions)?;
            debug!(sample = %sample, path = %path.display(), "Depth measured");
            Ok((sample, depths))
        })
        .collect();

    let mut samples = Vec::with_capacity(measured.len());
    for result in measured {
        let (sample, depths) = result?;
        for (site, depth) in depths {
            table.set_coverage(&site, &sample, depth)?;
        }
        samples.push(sample);
    }

    info!(samples = samples.len(), sites = positions.len(), "Coverage collected");
    Ok(samples)
}
