//! Conversion of htslib VCF/BCF records into [`VariantCall`]s.

use anyhow::{Context, Result};
use rust_htslib::bcf::{self, Read};
use std::path::Path;
use tracing::debug;

use crate::frequency::{SampleValues, VariantCall, VariantTable};

// htslib sentinels for BCF missing values and vector padding
const FLOAT_MISSING_BITS: u32 = 0x7F80_0001;
const FLOAT_VECTOR_END_BITS: u32 = 0x7F80_0002;
const INT_MISSING: i32 = i32::MIN;
const INT_VECTOR_END: i32 = i32::MIN + 1;

/// Add every record of a variant file to the table.
pub fn load_variant_file(path: &Path, table: &mut VariantTable) -> Result<usize> {
    let mut reader = bcf::Reader::from_path(path)
        .with_context(|| format!("Failed to open variant file: {}", path.display()))?;
    let sample_names: Vec<String> = reader
        .header()
        .samples()
        .iter()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect();

    let mut n_records = 0;
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to read record in {}", path.display()))?;
        let call = to_variant_call(&record, &sample_names)?;
        table.add_call(&call)?;
        n_records += 1;
    }

    debug!(path = %path.display(), records = n_records, "Variant file loaded");
    Ok(n_records)
}

fn to_variant_call(record: &bcf::Record, sample_names: &[String]) -> Result<VariantCall> {
    let rid = record.rid().context("Variant record without chromosome")?;
    let chrom = String::from_utf8_lossy(record.header().rid2name(rid)?).into_owned();
    let pos = record.pos() + 1;

    let alts = record
        .alleles()
        .iter()
        .skip(1)
        .map(|allele| String::from_utf8_lossy(allele).into_owned())
        .collect();

    let info_dp = match record.info(b"DP").integer() {
        Ok(Some(values)) => int_values(&values).and_then(|dp| dp.into_iter().flatten().next()),
        _ => None,
    };
    let info_af = match record.info(b"AF").float() {
        Ok(Some(values)) => float_values(&values),
        _ => None,
    };

    let format_af = record.format(b"AF").float().ok();
    let format_ad = record.format(b"AD").integer().ok();

    let samples = sample_names
        .iter()
        .enumerate()
        .map(|(idx, name)| SampleValues {
            name: name.clone(),
            af: format_af
                .as_ref()
                .and_then(|values| values.get(idx))
                .and_then(|values| float_values(values)),
            ad: format_ad
                .as_ref()
                .and_then(|values| values.get(idx))
                .and_then(|values| int_values(values)),
        })
        .collect();

    Ok(VariantCall {
        chrom,
        pos,
        alts,
        info_dp,
        info_af,
        samples,
    })
}

/// Entries of a FORMAT/INFO float vector up to its padding, `.` as `None`.
///
/// `None` when every entry is missing, so the caller can try another source.
fn float_values(values: &[f32]) -> Option<Vec<Option<f64>>> {
    let entries: Vec<Option<f64>> = values
        .iter()
        .take_while(|v| v.to_bits() != FLOAT_VECTOR_END_BITS)
        .map(|v| (v.to_bits() != FLOAT_MISSING_BITS).then(|| f64::from(*v)))
        .collect();
    present(entries)
}

fn int_values(values: &[i32]) -> Option<Vec<Option<i64>>> {
    let entries: Vec<Option<i64>> = values
        .iter()
        .take_while(|v| **v != INT_VECTOR_END)
        .map(|v| (*v != INT_MISSING).then(|| i64::from(*v)))
        .collect();
    present(entries)
}

fn present<T>(entries: Vec<Option<T>>) -> Option<Vec<Option<T>>> {
    if entries.iter().any(Option::is_some) {
        Some(entries)
    } else {
        None
    }
}
