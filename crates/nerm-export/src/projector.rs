//! CSV projection of a finished JSON export.
//!
//! The header is the schema's fixed headers followed by every attribute key
//! seen in any record, sorted and deduplicated. Records lacking a key get an
//! empty cell.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use nerm_core::{Record, RecordSchema};
use serde_json::Value;
use tracing::debug;

use crate::error::{ExportError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionSummary {
    pub rows: usize,
    pub columns: usize,
    pub dynamic_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CsvProjector {
    schema: &'static RecordSchema,
}

impl CsvProjector {
    pub fn new(schema: &'static RecordSchema) -> Self {
        Self { schema }
    }

    /// Read `json_path` and write `csv_path`.
    ///
    /// The input is fully decoded before `csv_path` is created, so a
    /// malformed input never leaves a CSV file behind.
    pub fn project(&self, json_path: &Path, csv_path: &Path) -> Result<ProjectionSummary> {
        let file = File::open(json_path).map_err(|e| ExportError::io(json_path, e))?;
        let records = self.load(BufReader::new(file))?;

        let out = File::create(csv_path).map_err(|e| ExportError::io(csv_path, e))?;
        let summary = self.write_records(&records, out)?;
        debug!(
            csv = %csv_path.display(),
            rows = summary.rows,
            columns = summary.columns,
            "wrote CSV"
        );
        Ok(summary)
    }

    /// Same as [`CsvProjector::project`] for arbitrary reader and writer.
    pub fn project_to_writer<R: Read, W: Write>(&self, input: R, output: W) -> Result<ProjectionSummary> {
        let records = self.load(input)?;
        self.write_records(&records, output)
    }

    /// Decode a JSON array of records.
    pub fn load<R: Read>(&self, input: R) -> Result<Vec<Record>> {
        let values: Vec<Value> = serde_json::from_reader(input)
            .map_err(|e| ExportError::decode(format!("export file is not a JSON array of records: {e}")))?;
        Ok(Record::from_values(self.schema, &values)?)
    }

    pub fn write_records<W: Write>(&self, records: &[Record], output: W) -> Result<ProjectionSummary> {
        let dynamic_keys: Vec<String> = records
            .iter()
            .flat_map(|r| r.attributes().keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect();

        let mut header: Vec<&str> = self.schema.fixed_headers();
        header.extend(dynamic_keys.iter().map(String::as_str));

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(output);
        writer.write_record(&header)?;

        let fixed: Vec<&str> = self.schema.csv_fields().map(|f| f.key).collect();
        for record in records {
            let mut row: Vec<String> = Vec::with_capacity(header.len());
            row.extend(fixed.iter().map(|key| record.cell(key)));
            row.extend(
                dynamic_keys
                    .iter()
                    .map(|key| record.attribute(key).unwrap_or_default().to_string()),
            );
            writer.write_record(&row)?;
        }
        writer.flush().map_err(csv::Error::from)?;

        Ok(ProjectionSummary {
            rows: records.len(),
            columns: header.len(),
            dynamic_keys,
        })
    }
}

/// CSV path for a JSON file: the first `json` in the path becomes `csv`.
pub fn csv_path_for(json_path: &Path) -> PathBuf {
    PathBuf::from(json_path.to_string_lossy().replacen("json", "csv", 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerm_core::schema::{IDENTITY_PROOFING_RESULT, PROFILE};

    const INPUT: &str = r#"[
        {"id":"1","uid":"u1","name":"Ada","status":"Active","attributes":{"b":"x","a":"y"}},
        {"id":"2","uid":"u2","name":"Bo, Jr.","status":"Inactive","attributes":{"c":"z"}}
    ]"#;

    fn project(input: &str) -> (String, ProjectionSummary) {
        let mut out = Vec::new();
        let summary = CsvProjector::new(&PROFILE)
            .project_to_writer(input.as_bytes(), &mut out)
            .unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn test_header_is_fixed_then_sorted_keys() {
        let (csv, summary) = project(INPUT);
        let header = csv.lines().next().unwrap();
        assert_eq!(
            header,
            "ID,UID,Name,ProfileTypeID,Status,IDProofingStatus,UpdatedAt,CreatedAt,a,b,c"
        );
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 11);
        assert_eq!(summary.dynamic_keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_missing_keys_are_empty_cells() {
        let (csv, _) = project(INPUT);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "1,u1,Ada,,Active,,,,y,x,");
        assert_eq!(lines[2], "2,u2,\"Bo, Jr.\",,Inactive,,,,,,z");
    }

    #[test]
    fn test_archived_flag_stays_out_of_csv() {
        let (csv, summary) = project(r#"[{"id":"1","archived":true,"attributes":{"a":"y"}}]"#);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "ID,UID,Name,ProfileTypeID,Status,IDProofingStatus,UpdatedAt,CreatedAt,a"
        );
        assert_eq!(lines[1], "1,,,,,,,,y");
        assert_eq!(summary.columns, 9);
    }

    #[test]
    fn test_output_is_deterministic() {
        let (first, _) = project(INPUT);
        let (second, _) = project(INPUT);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_array_writes_header_only() {
        let mut out = Vec::new();
        CsvProjector::new(&IDENTITY_PROOFING_RESULT)
            .project_to_writer("[]".as_bytes(), &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ID,IdentityProofingActionID,WorkflowSessionID,ProfileID,IdentityProofingWorkflow,Result,UpdatedAt,CreatedAt\n"
        );
    }

    #[test]
    fn test_malformed_input_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("broken.json");
        let csv = dir.path().join("broken.csv");
        std::fs::write(&json, "[{\"id\":\"1\"},").unwrap();

        let err = CsvProjector::new(&PROFILE).project(&json, &csv).unwrap_err();
        assert!(matches!(err, ExportError::Decode(_)));
        assert!(!csv.exists());
    }

    #[test]
    fn test_csv_path_for() {
        assert_eq!(
            csv_path_for(Path::new("out/dev_Profile_Export1.json")),
            PathBuf::from("out/dev_Profile_Export1.csv")
        );
        assert_eq!(
            csv_path_for(Path::new("exports.json")),
            PathBuf::from("exports.csv")
        );
    }
}
