//! Illumina SampleSheet.csv reader.
//!
//! The sheet is a CSV file split into `[Section]` blocks. `[Header]`,
//! `[Manifests]` and `[Settings]` hold key/value pairs, `[Reads]` holds one
//! read length per line and `[Data]` is a table whose first row names the
//! columns.

use indexmap::IndexMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::SampleSheetError;

#[derive(Debug, Clone, Default)]
pub struct SampleSheet {
    pub header: IndexMap<String, String>,
    pub manifests: IndexMap<String, String>,
    pub reads: Vec<u32>,
    pub settings: IndexMap<String, String>,
    pub samples: Vec<IndexMap<String, String>>,
}

impl SampleSheet {
    /// Read a sample sheet from disk.
    pub fn from_path(path: &Path) -> Result<Self, SampleSheetError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a sample sheet from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SampleSheetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut sheet = SampleSheet::default();
        let mut section = String::new();
        let mut data_columns: Option<Vec<String>> = None;
        let mut seen_header = false;

        for result in csv_reader.records() {
            let record = result?;
            let first = record.get(0).unwrap_or("");

            if first.starts_with('[') {
                section = first.trim_matches(|c| c == '[' || c == ']').to_string();
                if section == "Header" {
                    seen_header = true;
                }
                continue;
            }
            if record.iter().all(str::is_empty) {
                continue;
            }

            let value = record.get(1).unwrap_or("").to_string();
            match section.as_str() {
                "Header" => {
                    sheet.header.insert(first.to_string(), value);
                }
                "Manifests" => {
                    sheet.manifests.insert(first.to_string(), value);
                }
                "Settings" => {
                    sheet.settings.insert(first.to_string(), value);
                }
                "Reads" => {
                    if let Ok(length) = first.parse() {
                        sheet.reads.push(length);
                    }
                }
                "Data" => match &data_columns {
                    None => {
                        data_columns = Some(record.iter().map(str::to_string).collect());
                    }
                    Some(columns) => {
                        let row = columns
                            .iter()
                            .cloned()
                            .zip(record.iter().map(str::to_string))
                            .collect();
                        sheet.samples.push(row);
                    }
                },
                _ => {}
            }
        }

        if !seen_header {
            return Err(SampleSheetError::MissingSection("Header"));
        }
        Ok(sheet)
    }

    /// Value of a `[Header]` key.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header.get(key).map(String::as_str)
    }

    /// Path of a manifest by its key (`A`, `B`, ...).
    pub fn manifest(&self, key: &str) -> Result<&str, SampleSheetError> {
        self.manifests
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SampleSheetError::MissingManifest(key.to_string()))
    }
}
