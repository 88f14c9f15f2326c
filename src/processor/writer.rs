//! Output writing for race runs
//!
//! Writes the stage list, per-stage snapshots and the rider snapshot as
//! canonical JSON (sorted keys, two-space indent) and the export tables as
//! CSV, keeping track of every file produced.

use crate::constants::{RIDERS_FILE_NAME, STAGES_FILE_NAME, stage_snapshot_file_name};
use crate::error::Result;
use crate::export::write_tables;
use crate::models::{RawRecord, RiderMap, StageDescriptor};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Serialize `value` with object keys sorted at every level.
///
/// Relies on serde_json's `preserve_order` feature being off, which makes
/// every JSON object a sorted map.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

/// Writer for every file a run produces
#[derive(Debug)]
pub struct OutputWriter {
    output_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl OutputWriter {
    /// Create a writer, creating the output directory if needed
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            written: Vec::new(),
        })
    }

    /// Files written so far, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }

    fn write_json<T: Serialize>(&mut self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        fs::write(&path, canonical_json(value)?)?;
        debug!("Wrote {}", path.display());
        self.written.push(path.clone());
        Ok(path)
    }

    pub fn write_stages(&mut self, stages: &[StageDescriptor]) -> Result<PathBuf> {
        self.write_json(STAGES_FILE_NAME, &stages)
    }

    /// Cleaned classification records of one stage
    pub fn write_stage_snapshot(
        &mut self,
        stage_number: &str,
        records: &[RawRecord],
    ) -> Result<PathBuf> {
        self.write_json(&stage_snapshot_file_name(stage_number), &records)
    }

    pub fn write_riders(&mut self, riders: &RiderMap) -> Result<PathBuf> {
        self.write_json(RIDERS_FILE_NAME, riders)
    }

    /// Every export-catalog table
    pub fn write_tables(&mut self, riders: &RiderMap, num_stages: usize) -> Result<Vec<PathBuf>> {
        let paths = write_tables(&self.output_dir, riders, num_stages)?;
        self.written.extend(paths.iter().cloned());
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rider, RiderProfile};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let text = canonical_json(&json!({
            "b": {"z": 1, "a": [{"y": 2, "x": 3}]},
            "a": null,
        }))
        .unwrap();

        let a = text.find("\"a\": null").unwrap();
        let b = text.find("\"b\"").unwrap();
        assert!(a < b);
        assert!(text.find("\"x\"").unwrap() < text.find("\"y\"").unwrap());
        assert!(text.contains("\n  \"b\": {\n    \"a\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_riders_snapshot_is_reproducible() {
        let dir = TempDir::new().unwrap();
        let mut writer = OutputWriter::new(dir.path().join("out")).unwrap();

        let mut riders = RiderMap::new();
        for id in ["2", "10", "1"] {
            riders.insert(id.to_string(), Rider::new(RiderProfile::default(), 2));
        }

        let path = writer.write_riders(&riders).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        writer.write_riders(&riders).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert!(first.find("\"1\"").unwrap() < first.find("\"10\"").unwrap());
        assert!(first.find("\"10\"").unwrap() < first.find("\"2\"").unwrap());
        assert_eq!(writer.written().len(), 2);
    }

    #[test]
    fn test_stage_snapshot_file_name() {
        let dir = TempDir::new().unwrap();
        let mut writer = OutputWriter::new(dir.path()).unwrap();

        let path = writer.write_stage_snapshot("7", &[]).unwrap();
        assert_eq!(path, dir.path().join("stage_classification_07.json"));
        assert_eq!(fs::read_to_string(path).unwrap(), "[]\n");
    }
}
