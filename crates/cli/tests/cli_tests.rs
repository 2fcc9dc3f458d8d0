// End-to-end tests of the `assetrecon` binary: exit codes, report on stdout,
// JSON and annotated outputs. Workbooks are generated per test; no PDFs are
// involved, so poppler and tesseract need not be installed.
//
// Run with: cargo test -p assetrecon-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn assetrecon() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_assetrecon"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("ASSETRECON_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Ledger workbook: a MATRIZ reference sheet plus one sheet per unit, each
/// with seven header rows above `(code, label, value)` data rows.
fn write_ledger(dir: &Path, with_reference: bool, units: &[(&str, Vec<(f64, &str, f64)>)]) -> PathBuf {
    let path = dir.join("ledger.xlsx");
    let mut wb = Workbook::new();
    if with_reference {
        let sheet = wb.add_worksheet().set_name("MATRIZ").unwrap();
        sheet.write_number(0, 0, 123110745.0).unwrap();
        sheet.write_string(0, 1, "VEICULOS").unwrap();
        sheet.write_number(1, 0, 123110801.0).unwrap();
        sheet.write_string(1, 1, "ALMOXARIFADO").unwrap();
    }
    for (name, rows) in units {
        let sheet = wb.add_worksheet().set_name(*name).unwrap();
        for header in 0..7u32 {
            sheet.write_string(header, 0, format!("cabecalho {header}")).unwrap();
        }
        for (i, (code, label, value)) in rows.iter().enumerate() {
            let r = 7 + i as u32;
            sheet.write_number(r, 0, *code).unwrap();
            sheet.write_string(r, 1, *label).unwrap();
            sheet.write_number(r, 2, *value).unwrap();
        }
    }
    wb.save(&path).unwrap();
    path
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_ruleset() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ruleset.toml");
    std::fs::write(&config, "[ledger]\nexclusion_codes = [123110703, 123110402, 44905287]\n").unwrap();

    let output = assetrecon().args(["validate", config.to_str().unwrap()]).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("valid: 3 exclusion code(s)"));
}

#[test]
fn validate_rejects_negative_tolerance() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ruleset.toml");
    std::fs::write(&config, "[tolerance]\ndivergence = -0.5\n").unwrap();

    let output = assetrecon().args(["validate", config.to_str().unwrap()]).output().unwrap();
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).starts_with("error:"));
}

#[test]
fn validate_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ruleset.toml");
    std::fs::write(&config, "[ledger]\nheader_row = 7\n").unwrap();

    let output = assetrecon().args(["validate", config.to_str().unwrap()]).output().unwrap();
    assert_eq!(output.status.code(), Some(10));
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_without_statement_reports_divergence() {
    let dir = TempDir::new().unwrap();
    let ledger = write_ledger(
        dir.path(),
        true,
        &[("UG 160001", vec![(123110745.0, "Veiculos", 1000.0), (123110703.0, "Excluded", 50.0)])],
    );

    let output = assetrecon()
        .args(["run", "--no-ocr", "--ledger", ledger.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    let csv = stdout(&output);
    let lines: Vec<&str> = csv.lines().collect();
    assert!(lines[0].starts_with("kind,unit_id"));
    assert_eq!(lines[1], "unit_header,160001,,UG 160001,,,,");
    assert!(lines[2].starts_with("divergence,160001,45,"), "got {}", lines[2]);
    assert!(lines[2].ends_with("1000.00,0.00,-1000.00,"), "got {}", lines[2]);
    assert!(lines.iter().any(|l| l.starts_with("grand_totals,")));

    let err = stderr(&output);
    assert!(err.contains("1 unit(s) reconciled, 1 with divergences, 0 skipped"));
    assert!(err.contains("[160001] no statement document found"));
    assert!(err.contains("error: divergences found in 1 of 1 unit(s)"));
}

#[test]
fn run_with_nothing_to_reconcile_succeeds() {
    let dir = TempDir::new().unwrap();
    let ledger = write_ledger(dir.path(), true, &[("UG 160001", vec![])]);

    let output = assetrecon()
        .args(["run", "--no-ocr", "--quiet", "--ledger", ledger.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("kind,unit_id"));
}

#[test]
fn missing_reference_sheet_is_fatal() {
    let dir = TempDir::new().unwrap();
    let ledger = write_ledger(dir.path(), false, &[("UG 160001", vec![(123110745.0, "Veiculos", 1.0)])]);
    let out = dir.path().join("report.csv");

    let output = assetrecon()
        .args(["run", "--no-ocr", "--ledger", ledger.to_str().unwrap()])
        .args(["--out", out.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(11));
    assert!(stderr(&output).contains("hint:"));
    assert!(!out.exists(), "no report is written when the run aborts");
}

#[test]
fn unsupported_report_extension_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let ledger = write_ledger(dir.path(), true, &[]);

    let output = assetrecon()
        .args(["run", "--no-ocr", "--ledger", ledger.to_str().unwrap(), "--out", "report.pdf"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_ledger_is_io_error() {
    let output = assetrecon()
        .args(["run", "--no-ocr", "--ledger", "/nonexistent/ledger.xlsx"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn run_writes_json_xlsx_and_annotated_outputs() {
    let dir = TempDir::new().unwrap();
    let ledger = write_ledger(
        dir.path(),
        true,
        &[
            ("UG 160001", vec![(123110745.0, "Veiculos", 1000.0), (123110801.0, "Almox", 12.5)]),
            ("UG 160002", vec![]),
        ],
    );
    let statements = dir.path().join("pdfs");
    std::fs::create_dir(&statements).unwrap();
    let json = dir.path().join("report.json");
    let xlsx = dir.path().join("report.xlsx");
    let annotated = dir.path().join("annotated.xlsx");

    let output = assetrecon()
        .args(["run", "--no-ocr", "--ledger", ledger.to_str().unwrap()])
        .args(["--statements", statements.to_str().unwrap()])
        .args(["--out", xlsx.to_str().unwrap()])
        .args(["--json", json.to_str().unwrap()])
        .args(["--annotated", annotated.to_str().unwrap()])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty(), "report goes to --out, not stdout");
    assert!(xlsx.exists());
    assert!(annotated.exists());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["summary"]["units"], 2);
    assert_eq!(report["summary"]["units_with_divergence"], 1);
    let units = report["units"].as_array().unwrap();
    assert_eq!(units[0]["unit_id"], "160001");
    assert_eq!(units[0]["flags"][0]["level"], "critical");
    assert_eq!(report["warnings"].as_array().unwrap().len(), 2);
}

#[test]
fn config_from_environment_is_applied() {
    let dir = TempDir::new().unwrap();
    // Excluding the only data row leaves nothing to diverge.
    let config = dir.path().join("ruleset.toml");
    std::fs::write(&config, "[ledger]\nexclusion_codes = [123110745]\n").unwrap();
    let ledger = write_ledger(dir.path(), true, &[("UG 160001", vec![(123110745.0, "Veiculos", 1000.0)])]);

    let output = assetrecon()
        .env("ASSETRECON_CONFIG", &config)
        .args(["run", "--no-ocr", "--quiet", "--ledger", ledger.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}
