// JSON export of the full batch report

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use assetrecon_recon::BatchReport;

/// Pretty-printed `BatchReport`: meta, summary, every unit with all rows,
/// warnings.
pub fn write_report_json(report: &BatchReport, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report).map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetrecon_recon::model::{BatchSummary, ReconMeta, Warning};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_report_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = BatchReport {
            meta: ReconMeta {
                engine_version: "0.3.0".into(),
                run_at: "2026-01-01T00:00:00+00:00".into(),
                tolerance: 0.05,
            },
            summary: BatchSummary { units: 1, ..Default::default() },
            units: Vec::new(),
            warnings: vec![Warning::page("160001", 3, "no text layer")],
        };

        write_report_json(&report, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["meta"]["tolerance"], 0.05);
        assert_eq!(parsed["summary"]["units"], 1);
        assert_eq!(parsed["warnings"][0]["unit"], "160001");
        assert_eq!(parsed["warnings"][0]["page"], 3);
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let report = BatchReport {
            meta: ReconMeta { engine_version: String::new(), run_at: String::new(), tolerance: 0.05 },
            summary: BatchSummary::default(),
            units: Vec::new(),
            warnings: Vec::new(),
        };
        assert!(write_report_json(&report, &path).is_err());
    }
}
