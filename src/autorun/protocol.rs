//! Sequencing protocols and the workflows they trigger.

use std::path::Path;

use crate::config::AutorunConfig;
use crate::error::SampleSheetError;
use crate::parser::SampleSheet;

/// Value of `Application`/`Workflow` for double-strand amplicon runs.
pub const AMPLICON_DS: &str = "Amplicon - DS";

/// Protocol of a sequencing run, read from its sample sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// Double-strand amplicon run; `design` names the panel resources folder.
    AmpliconDs { design: String },
    /// Anything without an automatic analysis.
    Other,
}

impl Protocol {
    /// Detect the protocol of a sample sheet.
    ///
    /// For amplicon runs the design is the manifest `A` file name without its
    /// `_A.txt` suffix (manifests must be named `<DESIGN>_A.txt` and
    /// `<DESIGN>_B.txt`).
    pub fn from_samplesheet(sheet: &SampleSheet) -> Result<Self, SampleSheetError> {
        let is_amplicon_ds = sheet.header_value("Application") == Some(AMPLICON_DS)
            || sheet.header_value("Workflow") == Some(AMPLICON_DS);
        if !is_amplicon_ds {
            return Ok(Protocol::Other);
        }

        let manifest = sheet.manifest("A")?;
        // sheets are written on Windows instruments
        let basename = manifest.rsplit(['/', '\\']).next().unwrap_or(manifest);
        let design = basename.split("_A.txt").next().unwrap_or(basename);
        Ok(Protocol::AmpliconDs {
            design: design.to_string(),
        })
    }

    /// Workflows to launch for this protocol, in launch order.
    pub fn workflows(&self) -> &'static [Workflow] {
        match self {
            Protocol::AmpliconDs { .. } => &[Workflow::Adivar, Workflow::AmpliconDs],
            Protocol::Other => &[],
        }
    }
}

/// Downstream analysis workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    /// Variant calling on the double-strand amplicon reads.
    Adivar,
    /// Annotation of the MiSeq Reporter variants.
    AmpliconDs,
}

impl Workflow {
    /// Output folder name of the workflow inside the run analysis folder.
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Adivar => "ADIVaR",
            Workflow::AmpliconDs => "AmpliconDS",
        }
    }

    /// Build the command line launching the workflow.
    pub fn command(
        &self,
        config: &AutorunConfig,
        samples_folder: &Path,
        out_folder: &Path,
        design: &str,
    ) -> Vec<String> {
        let resources = &config.resources_folder;
        let design_folder = resources.join(design);
        let assembly = &config.genome.assembly;
        let path = |p: &Path| p.display().to_string();

        let mut cmd = match self {
            Workflow::Adivar => vec![
                config.workflow_launcher("ADIVaR"),
                "adivar".to_string(),
                "--R1-end-adapter".to_string(),
                path(&resources.join("adapters").join("Illumina_3prim_adapter.fasta")),
                "--R2-end-adapter".to_string(),
                path(&resources.join("adapters").join("Illumina_5prim_adapter_rvc.fasta")),
                "--libA-folder".to_string(),
                path(&design_folder.join(assembly).join("libA")),
                "--libB-folder".to_string(),
                path(&design_folder.join(assembly).join("libB")),
                "--RNA-selection".to_string(),
                path(&design_folder.join("reference_RNA.tsv")),
            ],
            Workflow::AmpliconDs => vec![
                config.workflow_launcher("AmpliconDSAnnot"),
                "amplicondsannot".to_string(),
                "--RNA-selection".to_string(),
                path(&design_folder.join("reference_RNA.tsv")),
            ],
        };

        for name in &config.pos_ctrl_names {
            cmd.push("--pos-ctrl-names".to_string());
            cmd.push(name.clone());
        }

        let (expected_folder, filters) = match self {
            Workflow::Adivar => (design_folder.join(assembly), "ampliDS_filters.json"),
            Workflow::AmpliconDs => (
                design_folder.join(format!("{}_chr", assembly)),
                "ampliDS_filters_wfAmpliconDS.json",
            ),
        };
        cmd.push("--pos-ctrl-expected".to_string());
        cmd.push(path(&expected_folder.join("pos_ctrl_expected.vcf")));
        cmd.push("--assembly-version".to_string());
        cmd.push(assembly.clone());
        if *self == Workflow::Adivar {
            cmd.push("--genome-seq".to_string());
            cmd.push(path(&config.genome.sequences));
        }
        cmd.push("--filters".to_string());
        cmd.push(path(&resources.join(filters)));
        cmd.push("--samplesheet".to_string());
        cmd.push(path(&samples_folder.join("SampleSheet.csv")));
        cmd.push("--output-dir".to_string());
        cmd.push(path(out_folder));
        cmd
    }
}
