use std::collections::BTreeMap;

use crate::config::ToleranceConfig;
use crate::model::{
    LedgerAggregate, LedgerExtraction, Presence, ReconciliationRow, StatementAggregate, UnitResult,
};
use crate::normalize::round2;

/// Label for keys that only the statement knows about.
pub const LABEL_NOT_IN_LEDGER: &str = "NOT FOUND IN LEDGER";

/// Reconcile one unit: outer join of ledger and statement aggregates by key.
///
/// Rows come out in ascending key order. A side missing a key contributes
/// `0.0`. The internal stock balance is carried through for reporting and
/// never influences `has_divergence`.
pub fn reconcile(
    unit_id: &str,
    sheet_name: &str,
    ledger: &LedgerExtraction,
    statement: &[StatementAggregate],
    tolerance: &ToleranceConfig,
) -> UnitResult {
    let ledger_map: BTreeMap<i64, &LedgerAggregate> =
        ledger.aggregates.iter().map(|a| (a.group_key, a)).collect();
    let statement_map: BTreeMap<i64, &StatementAggregate> =
        statement.iter().map(|a| (a.group_key, a)).collect();

    let mut rows = Vec::with_capacity(ledger_map.len().max(statement_map.len()));

    for (key, l) in &ledger_map {
        let (statement_value, presence) = match statement_map.get(key) {
            Some(s) => (s.sum_value, Presence::Both),
            None => (0.0, Presence::LedgerOnly),
        };
        rows.push(row(*key, l.sum_value, statement_value, l.label.clone(), presence, tolerance));
    }
    for (key, s) in &statement_map {
        if !ledger_map.contains_key(key) {
            rows.push(row(
                *key,
                0.0,
                s.sum_value,
                LABEL_NOT_IN_LEDGER.to_string(),
                Presence::StatementOnly,
                tolerance,
            ));
        }
    }
    rows.sort_by_key(|r| r.group_key);

    let total_ledger = round2(rows.iter().map(|r| r.ledger_value).sum());
    let total_statement = round2(rows.iter().map(|r| r.statement_value).sum());
    let total_difference = round2(total_statement - total_ledger);
    let has_divergence = rows.iter().any(|r| r.divergent);

    let internal_stock_balance = round2(ledger.internal_stock_balance);

    UnitResult {
        unit_id: unit_id.to_string(),
        sheet_name: sheet_name.to_string(),
        rows,
        total_ledger,
        total_statement,
        total_difference,
        total_divergent: total_difference.abs() > tolerance.divergence,
        internal_stock_balance,
        internal_stock_flagged: internal_stock_balance.abs() > tolerance.internal_stock_epsilon,
        has_divergence,
        flags: ledger.flags.clone(),
    }
}

fn row(
    group_key: i64,
    ledger_value: f64,
    statement_value: f64,
    label: String,
    presence: Presence,
    tolerance: &ToleranceConfig,
) -> ReconciliationRow {
    let difference = round2(statement_value - ledger_value);
    ReconciliationRow {
        group_key,
        ledger_value,
        statement_value,
        label,
        difference,
        divergent: difference.abs() > tolerance.divergence,
        presence,
    }
}
