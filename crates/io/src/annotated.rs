// Annotated ledger workbook: each unit sheet written back with its
// resolved labels, sorted by label, with a TOTAL row and highlight fills.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook as XlsxWorkbook};

use assetrecon_recon::batch::UnitLedger;
use assetrecon_recon::ledger::sorted_by_label;
use assetrecon_recon::model::HighlightLevel;
use assetrecon_recon::normalize::round2;

const HEADERS: [&str; 6] = ["Label", "Code", "Original label", "Value", "Key", "Sheet row"];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotatedSummary {
    pub sheets: usize,
    pub rows: usize,
    pub highlighted: usize,
}

pub fn write_annotated_ledger(ledgers: &[UnitLedger], path: &Path) -> Result<AnnotatedSummary, String> {
    let mut workbook = XlsxWorkbook::new();
    let mut summary = AnnotatedSummary::default();

    let header = Format::new().set_bold().set_border_bottom(FormatBorder::Thin);
    let money = Format::new().set_num_format("#,##0.00");
    let critical = Format::new().set_background_color(Color::RGB(0xFF9999));
    let critical_money = critical.clone().set_num_format("#,##0.00");
    let notice = Format::new().set_background_color(Color::RGB(0x9DC3E6));
    let notice_money = notice.clone().set_num_format("#,##0.00");
    let total = Format::new().set_bold().set_border_top(FormatBorder::Thin);
    let total_money = total.clone().set_num_format("#,##0.00");

    let mut used_names: Vec<String> = Vec::new();

    for ledger in ledgers {
        let name = unique_sheet_name(&ledger.sheet_name, &used_names);
        used_names.push(name.clone());

        let worksheet = workbook
            .add_worksheet()
            .set_name(&name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;

        for (col, title) in HEADERS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, *title, &header)
                .map_err(|e| format!("Failed to write header: {}", e))?;
        }

        let mut row: u32 = 1;
        let mut sum = 0.0;
        for rec in sorted_by_label(&ledger.records) {
            let (text_format, value_format) = match rec.highlight {
                Some(HighlightLevel::Critical) => (Some(&critical), &critical_money),
                Some(HighlightLevel::Notice) => (Some(&notice), &notice_money),
                None => (None, &money),
            };
            let key = if rec.internal_stock {
                "stock".to_string()
            } else {
                rec.group_key.to_string()
            };
            let texts = [
                (0u16, rec.resolved_label.as_str()),
                (1, rec.raw_code.as_str()),
                (2, rec.original_label.as_str()),
                (4, key.as_str()),
            ];
            for (col, text) in texts {
                let result = match text_format {
                    Some(f) => worksheet.write_string_with_format(row, col, text, f),
                    None => worksheet.write_string(row, col, text),
                };
                result.map_err(|e| format!("Failed to write row {}: {}", row, e))?;
            }
            worksheet
                .write_number_with_format(row, 3, rec.value, value_format)
                .map_err(|e| format!("Failed to write row {}: {}", row, e))?;
            worksheet
                .write_number(row, 5, rec.row as f64)
                .map_err(|e| format!("Failed to write row {}: {}", row, e))?;

            if rec.highlight.is_some() {
                summary.highlighted += 1;
            }
            sum += rec.value;
            row += 1;
            summary.rows += 1;
        }

        worksheet
            .write_string_with_format(row, 0, "TOTAL", &total)
            .map_err(|e| format!("Failed to write total: {}", e))?;
        worksheet
            .write_number_with_format(row, 3, round2(sum), &total_money)
            .map_err(|e| format!("Failed to write total: {}", e))?;

        worksheet.set_column_width(0, 48).map_err(|e| e.to_string())?;
        worksheet.set_column_width(2, 40).map_err(|e| e.to_string())?;
        worksheet.set_column_width(3, 16).map_err(|e| e.to_string())?;
        summary.sheets += 1;
    }

    if ledgers.is_empty() {
        // rust_xlsxwriter writes a default sheet; name it so the file is self-explanatory
        workbook
            .add_worksheet()
            .set_name("No units")
            .map_err(|e| e.to_string())?;
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    log::info!(
        "annotated ledger: {} sheets, {} rows written to {}",
        summary.sheets,
        summary.rows,
        path.display()
    );
    Ok(summary)
}

/// Excel sheet names: at most 31 chars, none of `[]:*?/\`, unique
/// case-insensitively.
fn unique_sheet_name(raw: &str, used: &[String]) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base: String = if cleaned.is_empty() { "Sheet".into() } else { cleaned.chars().take(31).collect() };

    let taken = |n: &str| used.iter().any(|u| u.eq_ignore_ascii_case(n));
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|i| {
            let suffix = format!(" ({i})");
            let keep = 31 - suffix.chars().count();
            format!("{}{}", base.chars().take(keep).collect::<String>(), suffix)
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}
