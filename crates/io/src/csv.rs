// CSV import (reference source) and CSV report export

use std::path::Path;

use assetrecon_recon::model::{Cell, Grid};
use assetrecon_recon::{ReconError, ReportRecord, ReportRenderer};

/// Read a delimited file into a grid. Every field is text; numeric
/// coercion happens in the engine.
pub fn import(path: &Path) -> Result<Grid, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    import_from_string(&name, &content, delimiter)
}

/// Pick the delimiter under which the most sample lines split into the
/// same number (>1) of fields as the first line. Brazilian exports use `;`
/// because `,` is the decimal separator, so `;` wins ties.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let field_count = |line: &str, delim: u8| -> usize {
        csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .and_then(|r| r.ok())
            .map_or(1, |r| r.len())
    };

    let mut best = (b',', 0usize);
    for delim in [b';', b'\t', b',', b'|'] {
        let Some(first) = sample.first().map(|l| field_count(l, delim)) else {
            break;
        };
        if first < 2 {
            continue;
        }
        let agreeing = sample.iter().filter(|l| field_count(l, delim) == first).count();
        if agreeing > best.1 {
            best = (delim, agreeing);
        }
    }
    best.0
}

/// File contents as UTF-8. Exports from Excel on Brazilian Windows
/// machines are usually Windows-1252 and get transcoded.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(String::from_utf8(bytes).unwrap_or_else(|e| {
        log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
        encoding_rs::WINDOWS_1252.decode(e.as_bytes()).0.into_owned()
    }))
}

fn import_from_string(name: &str, content: &str, delimiter: u8) -> Result<Grid, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(
            record
                .iter()
                .map(|field| if field.is_empty() { Cell::Empty } else { Cell::from(field) })
                .collect(),
        );
    }
    Ok(Grid::new(name, rows))
}

// ============================================================================
// Report export
// ============================================================================

const REPORT_HEADERS: [&str; 8] = [
    "kind",
    "unit_id",
    "group_key",
    "label",
    "ledger_value",
    "statement_value",
    "difference",
    "level",
];

/// Exception report as flat CSV, one line per record.
pub struct CsvReport {
    writer: csv::Writer<Vec<u8>>,
}

impl CsvReport {
    pub fn new() -> Result<Self, ReconError> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(REPORT_HEADERS).map_err(csv_err)?;
        Ok(Self { writer })
    }
}

impl ReportRenderer for CsvReport {
    fn append(&mut self, record: &ReportRecord) -> Result<(), ReconError> {
        let money = |v: &f64| format!("{v:.2}");
        let fields: [String; 8] = match record {
            ReportRecord::UnitHeader { unit_id, sheet_name } => [
                record.kind().into(),
                unit_id.clone(),
                String::new(),
                sheet_name.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
            ReportRecord::Divergence {
                unit_id,
                group_key,
                label,
                ledger_value,
                statement_value,
                difference,
            } => [
                record.kind().into(),
                unit_id.clone(),
                group_key.to_string(),
                label.clone(),
                money(ledger_value),
                money(statement_value),
                money(difference),
                String::new(),
            ],
            ReportRecord::InternalStock { unit_id, balance } => [
                record.kind().into(),
                unit_id.clone(),
                String::new(),
                String::new(),
                money(balance),
                String::new(),
                String::new(),
                String::new(),
            ],
            ReportRecord::Attention { unit_id, code, label, value, level, .. } => [
                record.kind().into(),
                unit_id.clone(),
                code.to_string(),
                label.clone(),
                money(value),
                String::new(),
                String::new(),
                level.to_string(),
            ],
            ReportRecord::Totals {
                unit_id,
                total_ledger,
                total_statement,
                total_difference,
                divergent,
            } => [
                record.kind().into(),
                unit_id.clone(),
                String::new(),
                if *divergent { "divergent".into() } else { String::new() },
                money(total_ledger),
                money(total_statement),
                money(total_difference),
                String::new(),
            ],
            ReportRecord::GrandTotals {
                units,
                units_with_divergence,
                total_ledger,
                total_statement,
                total_difference,
            } => [
                record.kind().into(),
                String::new(),
                String::new(),
                format!("{units} units, {units_with_divergence} with divergence"),
                money(total_ledger),
                money(total_statement),
                money(total_difference),
                String::new(),
            ],
        };
        self.writer.write_record(&fields).map_err(csv_err)
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ReconError> {
        self.writer
            .into_inner()
            .map_err(|e| ReconError::Io(format!("CSV write failed: {}", e.error())))
    }
}

fn csv_err(e: csv::Error) -> ReconError {
    ReconError::Io(format!("CSV write failed: {e}"))
}
