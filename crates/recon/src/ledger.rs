//! Ledger (SIAFI sheet) extraction: cleanup, exclusion filtering, label
//! resolution and aggregation by group key.

use std::collections::BTreeMap;

use crate::config::LedgerConfig;
use crate::model::{
    AttentionFlag, Cell, ExtractionStats, Grid, LedgerAggregate, LedgerExtraction, LedgerRecord,
};
use crate::normalize::{normalize_code, to_clean_code_string, to_display_string, to_group_key, to_number};
use crate::reference::ReferenceTable;

/// Label used when neither the reference table nor the row itself names a code.
pub const LABEL_NOT_FOUND: &str = "#N/A";

/// Extract one unit's sheet into per-key aggregates plus the internal stock
/// balance.
///
/// Rows before `header_rows` are boilerplate. A sheet with no data rows, or
/// whose rows are all filtered out, yields an empty extraction.
pub fn extract(grid: &Grid, reference: &ReferenceTable, config: &LedgerConfig) -> LedgerExtraction {
    let mut out = LedgerExtraction::default();

    if grid.height() <= config.header_rows {
        log::debug!("sheet '{}': no data rows below the {}-row header", grid.name, config.header_rows);
        return out;
    }

    let stock_code = config.internal_stock_code.trim();

    for r in config.header_rows..grid.height() {
        let sheet_row = r + 1;
        if grid.rows[r].iter().all(Cell::is_blank) {
            out.stats.blank_rows += 1;
            continue;
        }
        out.stats.data_rows += 1;

        let code_cell = grid.cell(r, config.code_column);
        let normalized_code = normalize_code(code_cell);
        let Some(code) = normalized_code.as_i64() else {
            log::debug!("sheet '{}' row {sheet_row}: code {:?} is not numeric, skipped", grid.name, code_cell);
            out.stats.invalid_code_rows += 1;
            continue;
        };

        if config.is_excluded(code) {
            out.stats.excluded_rows += 1;
            continue;
        }

        let raw_code = to_clean_code_string(code_cell);
        let value = to_number(grid.cell(r, config.value_column));
        let original_label = to_display_string(grid.cell(r, config.label_column));
        let resolved_label = resolve_label(reference, code, &original_label);
        if resolved_label == LABEL_NOT_FOUND {
            out.stats.unresolved_labels += 1;
        }

        let highlight = config.highlight_for(code).filter(|_| value != 0.0);
        if let Some(level) = highlight {
            out.flags.push(AttentionFlag {
                row: sheet_row,
                code,
                label: resolved_label.clone(),
                value,
                level,
            });
        }

        out.records.push(LedgerRecord {
            row: sheet_row,
            group_key: to_group_key(&raw_code),
            internal_stock: raw_code == stock_code,
            raw_code,
            normalized_code,
            value,
            original_label,
            resolved_label,
            highlight,
        });
    }

    let mut groups: BTreeMap<i64, LedgerAggregate> = BTreeMap::new();
    for rec in &out.records {
        if rec.internal_stock {
            out.internal_stock_balance += rec.value;
            out.stats.internal_stock_rows += 1;
            continue;
        }
        let agg = groups.entry(rec.group_key).or_insert_with(|| LedgerAggregate {
            group_key: rec.group_key,
            sum_value: 0.0,
            label: String::new(),
            record_count: 0,
        });
        agg.sum_value += rec.value;
        agg.record_count += 1;
        if agg.label.is_empty() && !rec.resolved_label.is_empty() {
            agg.label = rec.resolved_label.clone();
        }
    }
    out.aggregates = groups.into_values().collect();

    log::debug!(
        "sheet '{}': {} data rows, {} excluded, {} invalid codes, {} groups",
        grid.name,
        out.stats.data_rows,
        out.stats.excluded_rows,
        out.stats.invalid_code_rows,
        out.aggregates.len()
    );
    out
}

/// Reference hit, else the row's own label column, else [`LABEL_NOT_FOUND`].
fn resolve_label(reference: &ReferenceTable, code: i64, original_label: &str) -> String {
    reference
        .lookup(code as f64)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .or_else(|| Some(original_label).filter(|l| !l.is_empty()))
        .unwrap_or(LABEL_NOT_FOUND)
        .to_string()
}

/// Rows in text order of their resolved label, the order the annotated
/// export uses. Purely cosmetic.
pub fn sorted_by_label(records: &[LedgerRecord]) -> Vec<&LedgerRecord> {
    let mut sorted: Vec<&LedgerRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.resolved_label.cmp(&b.resolved_label).then(a.row.cmp(&b.row)));
    sorted
}
