//! Execution of external commands for the run watcher.

use anyhow::{bail, Context, Result};
use std::process::Command;
use tracing::info;

/// Runs an external command line; the first element is the program.
pub trait CommandRunner {
    fn run(&mut self, cmd: &[String]) -> Result<()>;
}

/// Runs commands as child processes and waits for them.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, cmd: &[String]) -> Result<()> {
        let Some((program, args)) = cmd.split_first() else {
            bail!("Empty command");
        };
        info!(cmd = %cmd.join(" "), "Running command");

        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("Failed to launch {}", program))?;
        if !status.success() {
            bail!("Command failed with {}: {}", status, cmd.join(" "));
        }
        Ok(())
    }
}
