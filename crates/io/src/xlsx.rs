// Excel import (ledger workbook, reference source) and XLSX report export

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook as XlsxWorkbook, Worksheet};

use assetrecon_recon::model::{Cell, Grid, HighlightLevel};
use assetrecon_recon::{ReconError, ReportRecord, ReportRenderer};

// ============================================================================
// Import
// ============================================================================

/// Every sheet of a workbook (xlsx, xls, xlsb, ods), in workbook order.
pub fn read_workbook(path: &Path) -> Result<Vec<Grid>, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut grids = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;
        grids.push(range_to_grid(name, &range));
    }
    Ok(grids)
}

/// Sheet names in workbook order, without reading any cell data.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// One named sheet, or the first sheet when `name` is `None`.
pub fn read_sheet(path: &Path, name: Option<&str>) -> Result<Grid, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    let sheet_name = match name {
        Some(n) => workbook
            .sheet_names()
            .iter()
            .find(|s| s.eq_ignore_ascii_case(n))
            .cloned()
            .ok_or_else(|| format!("Sheet '{}' not found in {}", n, path.display()))?,
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;
    Ok(range_to_grid(&sheet_name, &range))
}

/// Place the range at its absolute position: the data may not start at A1,
/// and the ledger layout counts header rows from the top of the sheet.
fn range_to_grid(name: &str, range: &Range<Data>) -> Grid {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells: Vec<Cell> = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(data_to_cell));
        while matches!(cells.last(), Some(Cell::Empty)) {
            cells.pop();
        }
        rows.push(cells);
    }
    Grid::new(name, rows)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // Store error as text representation
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

// ============================================================================
// Report export
// ============================================================================

const REPORT_HEADERS: [&str; 6] = ["Unit", "Key", "Label", "Ledger", "Statement", "Difference"];
const MONEY: &str = "#,##0.00";

struct ReportFormats {
    header: Format,
    unit: Format,
    money: Format,
    difference: Format,
    total_label: Format,
    total_money: Format,
    critical: Format,
    notice: Format,
}

impl ReportFormats {
    fn new() -> Self {
        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xD9D9D9))
                .set_border_bottom(FormatBorder::Thin),
            unit: Format::new().set_bold().set_font_size(12),
            money: Format::new().set_num_format(MONEY),
            difference: Format::new().set_num_format(MONEY).set_font_color(Color::RGB(0x9C0006)),
            total_label: Format::new().set_bold().set_align(FormatAlign::Right),
            total_money: Format::new()
                .set_bold()
                .set_num_format(MONEY)
                .set_border_top(FormatBorder::Thin),
            critical: Format::new().set_background_color(Color::RGB(0xFFC7CE)),
            notice: Format::new().set_background_color(Color::RGB(0xBDD7EE)),
        }
    }
}

/// Exception report as a single-sheet workbook.
pub struct XlsxReport {
    sheet: Worksheet,
    formats: ReportFormats,
    row: u32,
}

impl XlsxReport {
    pub fn new() -> Result<Self, ReconError> {
        let mut sheet = Worksheet::new();
        sheet.set_name("Divergences").map_err(xlsx_err)?;
        let formats = ReportFormats::new();
        for (col, title) in REPORT_HEADERS.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, *title, &formats.header)
                .map_err(xlsx_err)?;
        }
        sheet.set_column_width(0, 14).map_err(xlsx_err)?;
        sheet.set_column_width(2, 48).map_err(xlsx_err)?;
        for col in 3..6 {
            sheet.set_column_width(col, 16).map_err(xlsx_err)?;
        }
        sheet.set_freeze_panes(1, 0).map_err(xlsx_err)?;
        Ok(Self { sheet, formats, row: 1 })
    }
}

impl ReportRenderer for XlsxReport {
    fn append(&mut self, record: &ReportRecord) -> Result<(), ReconError> {
        let (ws, f, row) = (&mut self.sheet, &self.formats, self.row);
        match record {
            ReportRecord::UnitHeader { unit_id, sheet_name } => {
                ws.write_string_with_format(row, 0, format!("{unit_id}  ({sheet_name})"), &f.unit)
                    .map_err(xlsx_err)?;
            }
            ReportRecord::Divergence {
                unit_id,
                group_key,
                label,
                ledger_value,
                statement_value,
                difference,
            } => {
                ws.write_string(row, 0, unit_id).map_err(xlsx_err)?;
                ws.write_number(row, 1, *group_key as f64).map_err(xlsx_err)?;
                ws.write_string(row, 2, label).map_err(xlsx_err)?;
                money(ws, row, 3, *ledger_value, &f.money)?;
                money(ws, row, 4, *statement_value, &f.money)?;
                money(ws, row, 5, *difference, &f.difference)?;
            }
            ReportRecord::InternalStock { unit_id, balance } => {
                ws.write_string(row, 0, unit_id).map_err(xlsx_err)?;
                ws.write_string(row, 2, "Internal stock balance (informational)")
                    .map_err(xlsx_err)?;
                money(ws, row, 3, *balance, &f.money)?;
            }
            ReportRecord::Attention { unit_id, row: sheet_row, code, label, value, level } => {
                let fill = match level {
                    HighlightLevel::Critical => &f.critical,
                    HighlightLevel::Notice => &f.notice,
                };
                ws.write_string_with_format(row, 0, unit_id, fill).map_err(xlsx_err)?;
                ws.write_number_with_format(row, 1, *code as f64, fill).map_err(xlsx_err)?;
                ws.write_string_with_format(
                    row,
                    2,
                    format!("Attention ({level}), sheet row {sheet_row}: {label}"),
                    fill,
                )
                .map_err(xlsx_err)?;
                money(ws, row, 3, *value, &f.money)?;
            }
            ReportRecord::Totals {
                unit_id,
                total_ledger,
                total_statement,
                total_difference,
                divergent,
            } => {
                ws.write_string(row, 0, unit_id).map_err(xlsx_err)?;
                let label = if *divergent { "Total (divergent)" } else { "Total" };
                ws.write_string_with_format(row, 2, label, &f.total_label).map_err(xlsx_err)?;
                money(ws, row, 3, *total_ledger, &f.total_money)?;
                money(ws, row, 4, *total_statement, &f.total_money)?;
                money(ws, row, 5, *total_difference, &f.total_money)?;
                // blank spacer row between units
                self.row += 1;
            }
            ReportRecord::GrandTotals {
                units,
                units_with_divergence,
                total_ledger,
                total_statement,
                total_difference,
            } => {
                ws.write_string_with_format(
                    row,
                    2,
                    format!("Grand total: {units} units, {units_with_divergence} with divergence"),
                    &f.total_label,
                )
                .map_err(xlsx_err)?;
                money(ws, row, 3, *total_ledger, &f.total_money)?;
                money(ws, row, 4, *total_statement, &f.total_money)?;
                money(ws, row, 5, *total_difference, &f.total_money)?;
            }
        }
        self.row += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ReconError> {
        let mut workbook = XlsxWorkbook::new();
        workbook.push_worksheet(self.sheet);
        workbook.save_to_buffer().map_err(xlsx_err)
    }
}

fn money(ws: &mut Worksheet, row: u32, col: u16, value: f64, format: &Format) -> Result<(), ReconError> {
    ws.write_number_with_format(row, col, value, format).map_err(xlsx_err)?;
    Ok(())
}

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> ReconError {
    ReconError::Io(format!("XLSX write failed: {e}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assetrecon_recon::report::render;
    use tempfile::tempdir;

    fn write_and_read(records: &[ReportRecord]) -> Grid {
        let bytes = render(Box::new(XlsxReport::new().unwrap()), records).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        std::fs::write(&path, bytes).unwrap();
        read_sheet(&path, Some("Divergences")).unwrap()
    }

    #[test]
    fn report_layout() {
        let records = vec![
            ReportRecord::UnitHeader { unit_id: "160001".into(), sheet_name: "UG 160001".into() },
            ReportRecord::Divergence {
                unit_id: "160001".into(),
                group_key: 45,
                label: "Acoes".into(),
                ledger_value: 100.0,
                statement_value: 250.5,
                difference: 150.5,
            },
            ReportRecord::Totals {
                unit_id: "160001".into(),
                total_ledger: 100.0,
                total_statement: 250.5,
                total_difference: 150.5,
                divergent: true,
            },
            ReportRecord::GrandTotals {
                units: 1,
                units_with_divergence: 1,
                total_ledger: 100.0,
                total_statement: 250.5,
                total_difference: 150.5,
            },
        ];
        let grid = write_and_read(&records);

        assert_eq!(grid.cell(0, 0), &Cell::Text("Unit".into()));
        assert_eq!(grid.cell(0, 5), &Cell::Text("Difference".into()));
        assert_eq!(grid.cell(1, 0), &Cell::Text("160001  (UG 160001)".into()));
        assert_eq!(grid.cell(2, 1), &Cell::Number(45.0));
        assert_eq!(grid.cell(2, 2), &Cell::Text("Acoes".into()));
        assert_eq!(grid.cell(2, 5), &Cell::Number(150.5));
        assert_eq!(grid.cell(3, 2), &Cell::Text("Total (divergent)".into()));
        // spacer row after the unit totals
        assert!(grid.rows.get(4).map_or(true, |r| r.iter().all(Cell::is_blank)));
        assert!(matches!(grid.cell(5, 2), Cell::Text(s) if s.starts_with("Grand total: 1 units")));
    }

    #[test]
    fn grid_keeps_absolute_positions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");
        let mut wb = XlsxWorkbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("UG 160001").unwrap();
        ws.write_number(7, 0, 123110745.0).unwrap();
        ws.write_string(7, 1, "Acoes").unwrap();
        ws.write_number(7, 2, 500.0).unwrap();
        wb.save(&path).unwrap();

        let grids = read_workbook(&path).unwrap();
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].name, "UG 160001");
        assert_eq!(grids[0].height(), 8);
        assert_eq!(grids[0].cell(7, 0), &Cell::Number(123110745.0));
        assert_eq!(grids[0].cell(7, 2), &Cell::Number(500.0));
        assert_eq!(grids[0].cell(0, 0), &Cell::Empty);
    }

    #[test]
    fn missing_sheet_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.xlsx");
        let mut wb = XlsxWorkbook::new();
        wb.add_worksheet().set_name("MATRIZ").unwrap();
        wb.save(&path).unwrap();

        assert_eq!(sheet_names(&path).unwrap(), vec!["MATRIZ".to_string()]);
        assert!(read_sheet(&path, Some("matriz")).is_ok());
        let err = read_sheet(&path, Some("UG 1")).unwrap_err();
        assert!(err.contains("'UG 1' not found"));
    }

    #[test]
    fn data_conversion() {
        assert_eq!(data_to_cell(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(data_to_cell(&Data::String(String::new())), Cell::Empty);
        assert_eq!(data_to_cell(&Data::Bool(true)), Cell::Bool(true));
    }
}
