//! BAM front-end of the tagger.
//!
//! Streams a coordinate-sorted BAM, tags the valid reads, and writes the kept
//! pairs to a new coordinate-sorted BAM whose `@RG` lines describe the panel.

use anyhow::{Context, Result};
use rust_htslib::bam::record::Aux;
use rust_htslib::bam::{self, HeaderView, Read, Record};
use std::path::Path;
use tracing::{debug, info};

use crate::config::TaggingConfig;
use crate::matcher::classify_read;
use crate::parser::RegionIndex;
use crate::tagging::{PairBuffer, PairEmit, ReadGroups, TagCounts};
use crate::types::{AlignedRead, ReadClass};

/// Tag the reads of `input` with their amplicon and write the valid pairs to `output`.
///
/// `threads` is the number of htslib compression threads; values below 2
/// keep the codec single-threaded.
///
/// Kept pairs are sorted in memory before writing, so memory grows with the
/// number of valid reads.
pub fn tag_alignments(
    input: &Path,
    output: &Path,
    index: &RegionIndex,
    config: &TaggingConfig,
    threads: usize,
) -> Result<TagCounts> {
    let mut reader = bam::Reader::from_path(input)
        .with_context(|| format!("Failed to open alignment file: {}", input.display()))?;
    if threads > 1 {
        reader
            .set_threads(threads)
            .context("Failed to set reader threads")?;
    }

    let read_groups = ReadGroups::new(index, &config.rg_tag);
    let header_text = String::from_utf8_lossy(reader.header().as_bytes()).into_owned();
    let header_view = HeaderView::from_bytes(read_groups.rewrite_header(&header_text).as_bytes());
    let header = bam::Header::from_template(&header_view);

    let chrom_names: Vec<String> = reader
        .header()
        .target_names()
        .iter()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect();

    let mut counts = TagCounts::default();
    let mut pairs: PairBuffer<Record> = PairBuffer::new();
    let mut kept: Vec<Record> = Vec::new();

    for result in reader.records() {
        let mut record = result.context("Failed to read alignment record")?;
        if AlignedRead::is_secondary(&record) {
            continue;
        }

        let chrom = usize::try_from(record.tid())
            .ok()
            .and_then(|tid| chrom_names.get(tid))
            .map(String::as_str)
            .unwrap_or("");

        let class = classify_read(&record, chrom, index, config.anchor_offset);
        counts.record(&class);

        let ReadClass::Valid(region) = class else {
            continue;
        };
        let rg_id = read_groups
            .id_of(&region.id)
            .context("Interval without read group")?
            .to_string();

        // replaces any RG already set by the aligner
        if record.aux(b"RG").is_ok() {
            record
                .remove_aux(b"RG")
                .context("Failed to remove existing RG tag")?;
        }
        record
            .push_aux(b"RG", Aux::String(&rg_id))
            .context("Failed to set RG tag")?;

        let name = record.qname().to_vec();
        match pairs.push(&name, record) {
            PairEmit::Buffered => {}
            PairEmit::Pair(mate, current) => {
                counts.valid_in_pair += 2;
                kept.push(mate);
                kept.push(current);
            }
            PairEmit::Late(current) => kept.push(current),
        }
    }

    debug!(orphans = pairs.orphans(), "Valid reads without valid mate dropped");

    // unmapped (tid -1) sort last
    kept.sort_by_key(|record| (record.tid() as u32, record.pos(), record.is_reverse()));

    let mut writer = bam::Writer::from_path(output, &header, bam::Format::Bam)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;
    if threads > 1 {
        writer
            .set_threads(threads)
            .context("Failed to set writer threads")?;
    }
    for record in &kept {
        writer.write(record).context("Failed to write alignment record")?;
    }

    info!(
        total = counts.total,
        valid = counts.valid,
        kept = kept.len(),
        "Tagging finished"
    );
    Ok(counts)
}
