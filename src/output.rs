//! Output formatting for amplikit tables.
//!
//! All tables are tab-separated with a single header line.

use anyhow::Result;
use std::io::Write;

use crate::frequency::VariantTable;
use crate::tagging::TagCounts;

/// Write the tagging summary: one row per read category with its ratio.
///
/// The `Valid` row counts reads kept as part of a valid pair.
pub fn write_tag_summary<W: Write>(writer: &mut W, counts: &TagCounts) -> Result<()> {
    writeln!(writer, "Category\tCount\tRatio")?;
    let rows = [
        ("Unpaired", counts.unpaired),
        ("Unmapped", counts.unmapped),
        ("Out_target", counts.out_target),
        ("Cross_panel", counts.cross_panel),
        ("Valid", counts.valid_in_pair),
    ];
    for (category, count) in rows {
        writeln!(writer, "{}\t{}\t{:.6}", category, count, counts.ratio(count))?;
    }
    Ok(())
}

/// Write the coverage table: ALT alleles and per-sample depth of each site.
pub fn write_coverage_table<W: Write>(
    writer: &mut W,
    table: &VariantTable,
    samples: &[String],
) -> Result<()> {
    write!(writer, "#Chromosome\tPosition\tID")?;
    for sample in samples {
        write!(writer, "\t{}", sample)?;
    }
    writeln!(writer)?;

    for site in table.sites() {
        let alleles: Vec<&str> = site.alleles.keys().map(String::as_str).collect();
        write!(writer, "{}\t{}\t{}", site.chrom, site.pos, alleles.join(","))?;
        for sample in samples {
            let depth = site.coverage.get(sample).copied().unwrap_or(0);
            write!(writer, "\t{}", depth)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write the frequency table: one row per site and ALT allele.
///
/// Samples without a value for an allele, or with a missing one, get an
/// empty cell.
pub fn write_frequency_table<W: Write>(
    writer: &mut W,
    table: &VariantTable,
    samples: &[String],
) -> Result<()> {
    write!(writer, "#Chromosome\tPosition\tAllele")?;
    for sample in samples {
        write!(writer, "\t{}", sample)?;
    }
    writeln!(writer)?;

    for site in table.sites() {
        for (allele, by_sample) in &site.alleles {
            write!(writer, "{}\t{}\t{}", site.chrom, site.pos, allele)?;
            for sample in samples {
                match by_sample.get(sample).copied().flatten() {
                    Some(freq) => write!(writer, "\t{:.6}", freq)?,
                    None => write!(writer, "\t")?,
                }
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}
