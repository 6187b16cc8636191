//! Configuration and defaults for amplikit.
//!
//! `TaggingConfig` controls read-to-amplicon assignment. `AutorunConfig` holds
//! the site-specific paths used to build workflow command lines; it is loaded
//! from a JSON file and every field has a default.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Default tolerance between a read's first aligned base and the primer start.
pub const DEFAULT_ANCHOR_OFFSET: i64 = 4;

/// Default read-group field used to store the amplicon id.
pub const DEFAULT_RG_TAG: &str = "LB";

/// Placeholder replaced by the workflow name in `AutorunConfig::workflow_path`.
pub const WORKFLOW_NAME_PLACEHOLDER: &str = "WF_NAME";

/// Configuration for tagging reads with their amplicon.
#[derive(Debug, Clone)]
pub struct TaggingConfig {
    /// The alignment of a read can start up to N nucleotides after the primer start.
    pub anchor_offset: i64,
    /// Two-letter `@RG` field storing the amplicon id.
    pub rg_tag: String,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        TaggingConfig {
            anchor_offset: DEFAULT_ANCHOR_OFFSET,
            rg_tag: DEFAULT_RG_TAG.to_string(),
        }
    }
}

impl TaggingConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the values coming from the command line.
    pub fn validate(&self) -> Result<()> {
        if self.anchor_offset < 0 {
            bail!("The anchor offset cannot be lower than 0.");
        }
        let tag = self.rg_tag.as_bytes();
        if tag.len() != 2 || !tag[0].is_ascii_alphabetic() || !tag[1].is_ascii_alphanumeric() {
            bail!("The RG tag must be a two characters SAM tag (found '{}').", self.rg_tag);
        }
        Ok(())
    }
}

/// Reference genome used by the annotation workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    pub assembly: String,
    pub sequences: PathBuf,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        GenomeConfig {
            assembly: "GRCh37".to_string(),
            sequences: PathBuf::from("Homo_sapiens.GRCh37.75.dna.woutContigs.fa"),
        }
    }
}

/// Site settings for the run watcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutorunConfig {
    /// Folder containing one sub-folder per amplicon design, plus adapters and filters.
    pub resources_folder: PathBuf,
    pub genome: GenomeConfig,
    /// Workflow launcher; `WF_NAME` is replaced by the workflow name.
    pub workflow_path: String,
    /// Program used to move run data.
    pub rsync_path: String,
    /// Sample names identifying the positive control.
    pub pos_ctrl_names: Vec<String>,
}

impl Default for AutorunConfig {
    fn default() -> Self {
        AutorunConfig {
            resources_folder: PathBuf::from("amplicon_design"),
            genome: GenomeConfig::default(),
            workflow_path: format!("{}/current/app/bin/jflow_cli.py", WORKFLOW_NAME_PLACEHOLDER),
            rsync_path: "rsync".to_string(),
            pos_ctrl_names: vec![
                "HORIZON".to_string(),
                "horizon".to_string(),
                "Horizon".to_string(),
            ],
        }
    }
}

impl AutorunConfig {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Launcher path for a workflow.
    pub fn workflow_launcher(&self, workflow_name: &str) -> String {
        self.workflow_path
            .replace(WORKFLOW_NAME_PLACEHOLDER, workflow_name)
    }
}
