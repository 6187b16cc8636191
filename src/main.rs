//! CLI entry point for amplikit.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use amplikit::autorun::{ProcessRunner, RunWatcher, WatchFolders};
use amplikit::config::{AutorunConfig, TaggingConfig, DEFAULT_ANCHOR_OFFSET, DEFAULT_RG_TAG};
use amplikit::frequency::{collect_coverage, load_variant_file, VariantTable};
use amplikit::output::{write_coverage_table, write_frequency_table, write_tag_summary};
use amplikit::parser::parse_panel;
use amplikit::tagging::tag_alignments;

/// Amplicon sequencing pipeline tools.
#[derive(Parser, Debug)]
#[command(name = "amplikit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a read group identifying the panel amplicon to each valid read pair
    TagReads(TagReadsArgs),

    /// Build the per-sample allele frequency and coverage table of variant sites
    VariantFreq(VariantFreqArgs),

    /// Listen to the sequencer output folder and launch workflows on completed runs
    Autorun(AutorunArgs),
}

#[derive(Args, Debug)]
struct TagReadsArgs {
    /// Alignments file (BAM), sorted by coordinates
    #[arg(short = 'a', long = "input-aln")]
    input_aln: PathBuf,

    /// Amplicons with their primers (BED); unique IDs in the name field and a strand
    #[arg(short = 'p', long = "input-panel")]
    input_panel: PathBuf,

    /// Output alignments file (BAM)
    #[arg(short = 'o', long = "output-aln")]
    output_aln: PathBuf,

    /// RG tag used to store the amplicon ID
    #[arg(short = 't', long = "rg-tag", default_value = DEFAULT_RG_TAG)]
    rg_tag: String,

    /// The alignment of a read can start N nucleotides after the start of the primer
    #[arg(short = 'l', long = "anchor-offset", default_value_t = DEFAULT_ANCHOR_OFFSET)]
    anchor_offset: i64,

    /// Summary table output (default: stdout)
    #[arg(short = 's', long = "summary")]
    summary: Option<PathBuf>,

    /// Number of BAM compression threads (0 = auto-detect)
    #[arg(short = 'j', long = "threads", default_value = "1")]
    threads: usize,
}

#[derive(Args, Debug)]
struct VariantFreqArgs {
    /// Indexed alignment files (BAM); the sample name is the file name up to the first '_'
    #[arg(long = "aln-files", num_args = 1.., required = true)]
    aln_files: Vec<PathBuf>,

    /// Variant files (VCF/BCF)
    #[arg(long = "var-files", num_args = 1.., required = true)]
    var_files: Vec<PathBuf>,

    /// Coverage table output (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Optional per-allele frequency table output
    #[arg(long = "frequencies")]
    frequencies: Option<PathBuf>,

    /// Number of worker threads (0 = auto-detect)
    #[arg(short = 'j', long = "threads", default_value = "0")]
    threads: usize,
}

#[derive(Args, Debug)]
struct AutorunArgs {
    /// The sequencer output folder
    #[arg(short = 'l', long = "listened-folder")]
    listened_folder: PathBuf,

    /// Storage folder; run folders are moved here after processing
    #[arg(short = 's', long = "storage-folder")]
    storage_folder: PathBuf,

    /// Workflows output folder
    #[arg(short = 'a', long = "analysis-folder")]
    analysis_folder: PathBuf,

    /// Time between each sequencer output folder evaluation (in seconds)
    #[arg(short = 'r', long = "roll-time", default_value_t = 60 * 20)]
    roll_time: u64,

    /// Site settings (JSON)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Evaluate the folder once and exit
    #[arg(long = "once")]
    once: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("amplikit=debug,info")
    } else {
        EnvFilter::new("amplikit=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::TagReads(args) => run_tag_reads(args),
        Commands::VariantFreq(args) => run_variant_freq(args),
        Commands::Autorun(args) => run_autorun(args),
    }
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

/// Output writer: the file if given, stdout otherwise.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn run_tag_reads(args: TagReadsArgs) -> Result<()> {
    if !args.input_aln.exists() {
        bail!("Alignment file not found: {}", args.input_aln.display());
    }
    if !args.input_panel.exists() {
        bail!("Panel file not found: {}", args.input_panel.display());
    }

    let config = TaggingConfig {
        anchor_offset: args.anchor_offset,
        rg_tag: args.rg_tag.clone(),
    };
    config.validate()?;

    info!(panel = %args.input_panel.display(), "Parsing panel");
    let index = parse_panel(&args.input_panel)
        .with_context(|| format!("Invalid panel: {}", args.input_panel.display()))?;
    info!(amplicons = index.len(), "Panel loaded");

    let counts = tag_alignments(
        &args.input_aln,
        &args.output_aln,
        &index,
        &config,
        resolve_threads(args.threads),
    )?;

    let mut writer = open_output(args.summary.as_deref())?;
    write_tag_summary(&mut writer, &counts)?;
    writer.flush()?;
    Ok(())
}

fn run_variant_freq(args: VariantFreqArgs) -> Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(args.threads))
        .build_global()
        .context("Failed to create thread pool")?;

    let mut table = VariantTable::new();
    for path in &args.var_files {
        info!(path = %path.display(), "Loading variants");
        load_variant_file(path, &mut table)?;
    }
    info!(sites = table.len(), "Variant sites collected");

    let samples = collect_coverage(&args.aln_files, &mut table)?;

    let mut writer = open_output(args.output.as_deref())?;
    write_coverage_table(&mut writer, &table, &samples)?;
    writer.flush()?;

    if let Some(path) = &args.frequencies {
        let mut writer = open_output(Some(path))?;
        write_frequency_table(&mut writer, &table, &samples)?;
        writer.flush()?;
    }
    Ok(())
}

fn run_autorun(args: AutorunArgs) -> Result<()> {
    for folder in [&args.listened_folder, &args.storage_folder, &args.analysis_folder] {
        if !folder.is_dir() {
            bail!("Folder not found: {}", folder.display());
        }
    }

    let config = match &args.config {
        Some(path) => AutorunConfig::from_path(path)?,
        None => AutorunConfig::default(),
    };
    let folders = WatchFolders {
        listened: args.listened_folder,
        storage: args.storage_folder,
        analysis: args.analysis_folder,
    };
    let mut watcher = RunWatcher::new(folders, config, ProcessRunner);

    if args.once {
        let runs = watcher.run_pass()?;
        info!(runs = runs.len(), "Pass finished");
        Ok(())
    } else {
        watcher.watch(Duration::from_secs(args.roll_time))
    }
}
