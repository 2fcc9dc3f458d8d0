//! Exception report: the ordered record stream handed to a renderer.
//!
//! Per unit: header, divergent rows only, internal stock note (if flagged),
//! attention flags, totals. A single grand-totals record closes the stream.

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{BatchSummary, HighlightLevel, UnitResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportRecord {
    UnitHeader {
        unit_id: String,
        sheet_name: String,
    },
    Divergence {
        unit_id: String,
        group_key: i64,
        label: String,
        ledger_value: f64,
        statement_value: f64,
        difference: f64,
    },
    InternalStock {
        unit_id: String,
        balance: f64,
    },
    Attention {
        unit_id: String,
        row: usize,
        code: i64,
        label: String,
        value: f64,
        level: HighlightLevel,
    },
    Totals {
        unit_id: String,
        total_ledger: f64,
        total_statement: f64,
        total_difference: f64,
        divergent: bool,
    },
    GrandTotals {
        units: usize,
        units_with_divergence: usize,
        total_ledger: f64,
        total_statement: f64,
        total_difference: f64,
    },
}

impl ReportRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnitHeader { .. } => "unit_header",
            Self::Divergence { .. } => "divergence",
            Self::InternalStock { .. } => "internal_stock",
            Self::Attention { .. } => "attention",
            Self::Totals { .. } => "totals",
            Self::GrandTotals { .. } => "grand_totals",
        }
    }
}

/// Records for one unit, in report order.
pub fn unit_records(unit: &UnitResult) -> Vec<ReportRecord> {
    let id = &unit.unit_id;
    let mut out = vec![ReportRecord::UnitHeader {
        unit_id: id.clone(),
        sheet_name: unit.sheet_name.clone(),
    }];

    for row in unit.divergent_rows() {
        out.push(ReportRecord::Divergence {
            unit_id: id.clone(),
            group_key: row.group_key,
            label: row.label.clone(),
            ledger_value: row.ledger_value,
            statement_value: row.statement_value,
            difference: row.difference,
        });
    }

    if unit.internal_stock_flagged {
        out.push(ReportRecord::InternalStock {
            unit_id: id.clone(),
            balance: unit.internal_stock_balance,
        });
    }

    for flag in &unit.flags {
        out.push(ReportRecord::Attention {
            unit_id: id.clone(),
            row: flag.row,
            code: flag.code,
            label: flag.label.clone(),
            value: flag.value,
            level: flag.level,
        });
    }

    out.push(ReportRecord::Totals {
        unit_id: id.clone(),
        total_ledger: unit.total_ledger,
        total_statement: unit.total_statement,
        total_difference: unit.total_difference,
        divergent: unit.total_divergent,
    });
    out
}

/// Full report stream for a batch, units in the order given.
pub fn assemble(units: &[UnitResult], summary: &BatchSummary) -> Vec<ReportRecord> {
    let mut out: Vec<ReportRecord> = units.iter().flat_map(unit_records).collect();
    out.push(ReportRecord::GrandTotals {
        units: summary.units,
        units_with_divergence: summary.units_with_divergence,
        total_ledger: summary.total_ledger,
        total_statement: summary.total_statement,
        total_difference: summary.total_difference,
    });
    out
}

/// Lays report records out in a concrete document format.
pub trait ReportRenderer {
    fn append(&mut self, record: &ReportRecord) -> Result<(), ReconError>;
    /// Finish the document and return its bytes.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, ReconError>;
}

/// Feed every record to `renderer` and return the finished document.
pub fn render(
    mut renderer: Box<dyn ReportRenderer>,
    records: &[ReportRecord],
) -> Result<Vec<u8>, ReconError> {
    for record in records {
        renderer.append(record)?;
    }
    renderer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttentionFlag, Presence, ReconciliationRow};

    fn row(key: i64, ledger: f64, statement: f64, divergent: bool) -> ReconciliationRow {
        ReconciliationRow {
            group_key: key,
            ledger_value: ledger,
            statement_value: statement,
            label: format!("label {key}"),
            difference: statement - ledger,
            divergent,
            presence: Presence::Both,
        }
    }

    fn unit(rows: Vec<ReconciliationRow>, stock: f64) -> UnitResult {
        UnitResult {
            unit_id: "160001".into(),
            sheet_name: "UG 160001".into(),
            rows,
            total_ledger: 300.0,
            total_statement: 310.0,
            total_difference: 10.0,
            total_divergent: true,
            internal_stock_balance: stock,
            internal_stock_flagged: stock != 0.0,
            has_divergence: true,
            flags: vec![],
        }
    }

    #[test]
    fn only_divergent_rows_are_emitted() {
        let u = unit(vec![row(1, 100.0, 100.0, false), row(2, 200.0, 210.0, true)], 0.0);
        let records = unit_records(&u);
        let kinds: Vec<_> = records.iter().map(ReportRecord::kind).collect();
        assert_eq!(kinds, vec!["unit_header", "divergence", "totals"]);
        assert!(matches!(records[1], ReportRecord::Divergence { group_key: 2, .. }));
    }

    #[test]
    fn full_record_order() {
        let mut u = unit(vec![row(2, 200.0, 210.0, true)], 75.0);
        u.flags.push(AttentionFlag {
            row: 12,
            code: 123119905,
            label: "Bens a classificar".into(),
            value: 3.0,
            level: HighlightLevel::Notice,
        });
        let kinds: Vec<_> = unit_records(&u).iter().map(ReportRecord::kind).collect();
        assert_eq!(
            kinds,
            vec!["unit_header", "divergence", "internal_stock", "attention", "totals"]
        );
    }

    #[test]
    fn clean_unit_still_gets_header_and_totals() {
        let u = unit(vec![row(1, 5.0, 5.0, false)], 0.0);
        assert_eq!(unit_records(&u).len(), 2);
    }

    #[test]
    fn assemble_appends_grand_totals() {
        let units = vec![unit(vec![], 0.0), unit(vec![], 0.0)];
        let summary = BatchSummary { units: 2, ..Default::default() };
        let records = assemble(&units, &summary);
        assert_eq!(records.len(), 5);
        assert!(matches!(records.last(), Some(ReportRecord::GrandTotals { units: 2, .. })));
    }

    #[test]
    fn records_serialize_with_kind_tag() {
        let rec = ReportRecord::InternalStock { unit_id: "u".into(), balance: 75.0 };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["kind"], "internal_stock");
        assert_eq!(json["balance"], 75.0);
    }

    struct Lines(Vec<String>);

    impl ReportRenderer for Lines {
        fn append(&mut self, record: &ReportRecord) -> Result<(), ReconError> {
            self.0.push(record.kind().to_string());
            Ok(())
        }
        fn finish(self: Box<Self>) -> Result<Vec<u8>, ReconError> {
            Ok(self.0.join("\n").into_bytes())
        }
    }

    #[test]
    fn render_feeds_all_records() {
        let records = assemble(&[unit(vec![], 0.0)], &BatchSummary::default());
        let bytes = render(Box::new(Lines(vec![])), &records).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "unit_header\ntotals\ngrand_totals");
    }
}
