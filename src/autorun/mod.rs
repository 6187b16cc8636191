//! Sequencer output folder watcher.
//!
//! Every pass looks for finished runs (folders holding
//! `CompletedJobInfo.xml`), launches the workflows matching their protocol,
//! then moves the run data to the storage folder.

pub mod protocol;
pub mod runner;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AutorunConfig;
use crate::parser::SampleSheet;

pub use protocol::{Protocol, Workflow};
pub use runner::{CommandRunner, ProcessRunner};

/// File written by the sequencer when a run is over.
pub const RUN_COMPLETED_MARKER: &str = "CompletedJobInfo.xml";

/// Folders used by the watcher.
#[derive(Debug, Clone)]
pub struct WatchFolders {
    /// Sequencer output folder.
    pub listened: PathBuf,
    /// Raw run data is moved here after processing.
    pub storage: PathBuf,
    /// Workflow outputs, one sub-folder per run.
    pub analysis: PathBuf,
}

pub struct RunWatcher<C: CommandRunner> {
    folders: WatchFolders,
    config: AutorunConfig,
    runner: C,
}

impl<C: CommandRunner> RunWatcher<C> {
    pub fn new(folders: WatchFolders, config: AutorunConfig, runner: C) -> Self {
        RunWatcher {
            folders,
            config,
            runner,
        }
    }

    pub fn runner(&self) -> &C {
        &self.runner
    }

    /// Poll forever, sleeping `roll_time` between passes.
    pub fn watch(&mut self, roll_time: Duration) -> Result<()> {
        loop {
            self.run_pass()?;
            std::thread::sleep(roll_time);
        }
    }

    /// Process every completed run currently in the listened folder.
    ///
    /// Returns the names of the processed runs.
    pub fn run_pass(&mut self) -> Result<Vec<String>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.folders.listened)
            .with_context(|| {
                format!("Failed to list folder: {}", self.folders.listened.display())
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        entries.sort();

        let mut processed = Vec::new();
        for run_folder in entries {
            if !run_folder.join(RUN_COMPLETED_MARKER).exists() {
                continue;
            }
            let run_name = run_folder
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.process_run(&run_folder, &run_name)?;
            processed.push(run_name);
        }
        Ok(processed)
    }

    fn process_run(&mut self, run_folder: &Path, run_name: &str) -> Result<()> {
        info!(run = %run_name, "Run completed");
        let out_run_folder = self.folders.analysis.join(run_name);
        if !out_run_folder.exists() {
            fs::create_dir(&out_run_folder).with_context(|| {
                format!("Failed to create folder: {}", out_run_folder.display())
            })?;
        }

        let samples_folder = run_folder.join("Data").join("Intensities").join("BaseCalls");
        let sheet_path = samples_folder.join("SampleSheet.csv");
        let sheet = SampleSheet::from_path(&sheet_path)
            .with_context(|| format!("Failed to read sample sheet: {}", sheet_path.display()))?;
        let protocol = Protocol::from_samplesheet(&sheet)?;

        // analysis workflows
        if let Protocol::AmpliconDs { design } = &protocol {
            for workflow in protocol.workflows() {
                let out_wf_folder = out_run_folder.join(workflow.as_str());
                if out_wf_folder.exists() {
                    warn!(
                        workflow = workflow.as_str(),
                        run = %run_folder.display(),
                        "Workflow output already exists, the workflow cannot be run"
                    );
                    continue;
                }
                fs::create_dir(&out_wf_folder).with_context(|| {
                    format!("Failed to create folder: {}", out_wf_folder.display())
                })?;
                let cmd = workflow.command(&self.config, &samples_folder, &out_wf_folder, design);
                self.run_logged(&cmd, &out_wf_folder.join("log.txt"))?;
            }

            // move the Illumina analysis next to the annotation
            let illumina_analysis = samples_folder.join("Alignment");
            if illumina_analysis.is_dir() {
                let dest = out_run_folder.join(Workflow::AmpliconDs.as_str());
                self.sync(&illumina_analysis, &dest)?;
                remove_folder(&illumina_analysis)?;
            } else {
                warn!(run = %run_name, "No Illumina analysis to move");
            }
        }

        // raw data
        let storage_dest = self.folders.storage.join(run_name);
        self.sync(run_folder, &storage_dest)?;
        remove_folder(run_folder)?;
        Ok(())
    }

    /// Run a workflow command, recording start, command line and end in `log_path`.
    fn run_logged(&mut self, cmd: &[String], log_path: &Path) -> Result<()> {
        {
            let mut log = fs::File::create(log_path)
                .with_context(|| format!("Failed to create log: {}", log_path.display()))?;
            writeln!(log, "[START]\t{}", timestamp())?;
            writeln!(log, "[CMD]\t{}", cmd.join(" "))?;
        }
        self.runner.run(cmd)?;
        let mut log = OpenOptions::new().append(true).open(log_path)?;
        writeln!(log, "[END]\t{}", timestamp())?;
        Ok(())
    }

    /// Copy the content of `src` into `dest` with rsync.
    fn sync(&mut self, src: &Path, dest: &Path) -> Result<()> {
        let cmd = vec![
            self.config.rsync_path.clone(),
            "--recursive".to_string(),
            "--perms".to_string(),
            "--times".to_string(),
            format!("{}{}", src.display(), std::path::MAIN_SEPARATOR),
            dest.display().to_string(),
        ];
        self.runner.run(&cmd)
    }
}

fn remove_folder(path: &Path) -> Result<()> {
    info!(path = %path.display(), "Removing folder");
    fs::remove_dir_all(path).with_context(|| format!("Failed to remove folder: {}", path.display()))
}

fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
