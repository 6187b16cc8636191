//! Per-sample allele frequency and coverage tables.
//!
//! Variant sites are collected from one or more VCF files in the order they
//! are first seen, then each sample's depth at every site is measured from its
//! alignment file.

pub mod depth;
pub mod vcf;

use indexmap::IndexMap;

use crate::error::FrequencyError;

pub use depth::{collect_coverage, BamDepth, DepthSource};
pub use vcf::load_variant_file;

/// FORMAT values of one sample in a variant record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleValues {
    pub name: String,
    /// FORMAT `AF`, one value per ALT allele; `None` entries were `.`.
    pub af: Option<Vec<Option<f64>>>,
    /// FORMAT `AD`, reference depth first.
    pub ad: Option<Vec<Option<i64>>>,
}

/// A variant record reduced to what the frequency table needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantCall {
    pub chrom: String,
    /// 1-based position.
    pub pos: i64,
    pub alts: Vec<String>,
    pub info_dp: Option<i64>,
    pub info_af: Option<Vec<Option<f64>>>,
    pub samples: Vec<SampleValues>,
}

impl VariantCall {
    /// Site key: `chrom:pos`.
    pub fn site_id(&self) -> String {
        site_id(&self.chrom, self.pos)
    }
}

pub fn site_id(chrom: &str, pos: i64) -> String {
    format!("{}:{}", chrom, pos)
}

/// Allele frequencies of one sample, one value per ALT allele.
///
/// Sources are tried in order: the sample's `AF`, the sample's alt `AD`
/// divided by the record `DP`, and for single-sample records the record `AF`.
/// Missing entries stay in place as `None`.
pub fn allele_frequencies(
    call: &VariantCall,
    sample: &SampleValues,
) -> Result<Vec<Option<f64>>, FrequencyError> {
    if let Some(af) = &sample.af {
        return Ok(af.clone());
    }
    if let (Some(ad), Some(dp)) = (&sample.ad, call.info_dp) {
        if dp > 0 {
            return Ok(ad
                .iter()
                .skip(1)
                .map(|depth| depth.map(|depth| depth as f64 / dp as f64))
                .collect());
        }
    }
    if call.samples.len() <= 1 {
        if let Some(af) = &call.info_af {
            return Ok(af.clone());
        }
    }
    Err(FrequencyError::NoFrequency {
        site: call.site_id(),
    })
}

/// One variant position and what was measured there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantSite {
    pub chrom: String,
    pub pos: i64,
    /// ALT allele -> sample -> frequency, `None` when the caller left it missing.
    pub alleles: IndexMap<String, IndexMap<String, Option<f64>>>,
    /// Sample -> depth.
    pub coverage: IndexMap<String, u32>,
}

/// Variant sites keyed by `chrom:pos`, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    sites: IndexMap<String, VariantSite>,
}

impl VariantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the frequencies of every sample of a call.
    pub fn add_call(&mut self, call: &VariantCall) -> Result<(), FrequencyError> {
        let id = call.site_id();

        // compute first so a failing record leaves the table untouched
        let mut per_sample = Vec::with_capacity(call.samples.len());
        for sample in &call.samples {
            let freqs = allele_frequencies(call, sample)?;
            if freqs.len() < call.alts.len() {
                return Err(FrequencyError::AlleleCount {
                    site: id,
                    alleles: call.alts.len(),
                    frequencies: freqs.len(),
                });
            }
            per_sample.push((sample.name.clone(), freqs));
        }

        let site = self.sites.entry(id).or_insert_with(|| VariantSite {
            chrom: call.chrom.clone(),
            pos: call.pos,
            ..VariantSite::default()
        });
        for (sample, freqs) in per_sample {
            for (alt, freq) in call.alts.iter().zip(freqs) {
                site.alleles
                    .entry(alt.clone())
                    .or_default()
                    .insert(sample.clone(), freq);
            }
        }
        Ok(())
    }

    /// Store the depth of a sample at a site.
    ///
    /// Unknown sites are ignored; a second depth for the same sample and site
    /// is an error.
    pub fn set_coverage(
        &mut self,
        site_id: &str,
        sample: &str,
        depth: u32,
    ) -> Result<(), FrequencyError> {
        let Some(site) = self.sites.get_mut(site_id) else {
            return Ok(());
        };
        if site.coverage.contains_key(sample) {
            return Err(FrequencyError::DuplicateCoverage {
                sample: sample.to_string(),
                site: site_id.to_string(),
            });
        }
        site.coverage.insert(sample.to_string(), depth);
        Ok(())
    }

    pub fn sites(&self) -> impl Iterator<Item = &VariantSite> {
        self.sites.values()
    }

    /// Site positions as `(chrom, pos)`.
    pub fn positions(&self) -> Vec<(String, i64)> {
        self.sites
            .values()
            .map(|site| (site.chrom.clone(), site.pos))
            .collect()
    }

    pub fn get(&self, site_id: &str) -> Option<&VariantSite> {
        self.sites.get(site_id)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}
