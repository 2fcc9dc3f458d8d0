//! Sequential batch driver: reference table once, then every unit in turn.
//!
//! Only a reference failure aborts the run. A unit whose ledger sheet cannot
//! be read is skipped; a unit without a readable statement is reconciled
//! against an empty statement. Both cases are recorded as [`Warning`]s.

use crate::config::ReconConfig;
use crate::engine::reconcile;
use crate::error::ReconError;
use crate::ledger;
use crate::model::{
    BatchReport, BatchSummary, Grid, LedgerRecord, ReconMeta, StatementExtraction, UnitResult,
    Warning,
};
use crate::normalize::round2;
use crate::reference::ReferenceTable;
use crate::statement::{self, OcrEngine, PageSource};

/// One organizational unit: a ledger sheet plus whatever identifies its
/// statement document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub unit_id: String,
    pub sheet_name: String,
}

/// Where the batch reads its inputs from.
pub trait UnitInputs {
    fn reference(&self) -> Result<Grid, ReconError>;
    /// Units in processing order.
    fn units(&self) -> Result<Vec<UnitSpec>, ReconError>;
    fn ledger_sheet(&self, unit: &UnitSpec) -> Result<Grid, ReconError>;
    /// `Ok(None)` when no document is associated with the unit.
    fn statement<'a>(&'a self, unit: &UnitSpec) -> Result<Option<Box<dyn PageSource + 'a>>, ReconError>;
}

/// Post-exclusion ledger rows of one processed unit, kept for exports.
#[derive(Debug, Clone)]
pub struct UnitLedger {
    pub sheet_name: String,
    pub records: Vec<LedgerRecord>,
}

#[derive(Debug, Clone)]
pub struct BatchRun {
    pub report: BatchReport,
    pub ledgers: Vec<UnitLedger>,
}

pub fn run_batch(
    inputs: &dyn UnitInputs,
    ocr: Option<&dyn OcrEngine>,
    config: &ReconConfig,
) -> Result<BatchRun, ReconError> {
    let reference_grid = inputs.reference().map_err(|e| match e {
        ReconError::ReferenceLoad(_) => e,
        other => ReconError::ReferenceLoad(other.to_string()),
    })?;
    let reference = ReferenceTable::load(&reference_grid)?;

    let mut units: Vec<UnitResult> = Vec::new();
    let mut ledgers: Vec<UnitLedger> = Vec::new();
    let mut warnings: Vec<Warning> = Vec::new();
    let mut skipped = 0;

    for unit in inputs.units()? {
        if config.ledger.skips_sheet(&unit.sheet_name) {
            log::debug!("sheet '{}' is on the skip list", unit.sheet_name);
            continue;
        }
        log::info!("unit {} (sheet '{}')", unit.unit_id, unit.sheet_name);

        let grid = match inputs.ledger_sheet(&unit) {
            Ok(g) => g,
            Err(e) => {
                let err = ReconError::UnitExtraction {
                    unit: unit.unit_id.clone(),
                    message: e.to_string(),
                };
                log::warn!("{err}; unit skipped");
                warnings.push(Warning::unit(&unit.unit_id, format!("{err}; unit skipped")));
                skipped += 1;
                continue;
            }
        };
        let extraction = ledger::extract(&grid, &reference, &config.ledger);

        let statement = read_statement(inputs, ocr, &unit, config, &mut warnings);
        let result = reconcile(
            &unit.unit_id,
            &unit.sheet_name,
            &extraction,
            &statement.aggregates,
            &config.tolerance,
        );
        log::info!(
            "unit {}: {} rows, {} divergent, difference {:.2}",
            unit.unit_id,
            result.rows.len(),
            result.divergent_rows().count(),
            result.total_difference
        );

        ledgers.push(UnitLedger { sheet_name: unit.sheet_name.clone(), records: extraction.records });
        units.push(result);
    }

    let mut summary = summarize(&units);
    summary.units_skipped = skipped;

    Ok(BatchRun {
        report: BatchReport {
            meta: ReconMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                tolerance: config.tolerance.divergence,
            },
            summary,
            units,
            warnings,
        },
        ledgers,
    })
}

fn read_statement(
    inputs: &dyn UnitInputs,
    ocr: Option<&dyn OcrEngine>,
    unit: &UnitSpec,
    config: &ReconConfig,
    warnings: &mut Vec<Warning>,
) -> StatementExtraction {
    let document = match inputs.statement(unit) {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            log::warn!("unit {}: no statement document found", unit.unit_id);
            warnings.push(Warning::unit(
                &unit.unit_id,
                "no statement document found; reconciled against an empty statement",
            ));
            return StatementExtraction::default();
        }
        Err(e) => {
            log::warn!("unit {}: {e}", unit.unit_id);
            warnings.push(Warning::unit(&unit.unit_id, format!("statement unreadable: {e}")));
            return StatementExtraction::default();
        }
    };

    let extraction = statement::parse(document.as_ref(), ocr, &config.statement);
    for note in &extraction.notes {
        warnings.push(match note.page {
            Some(page) => Warning::page(&unit.unit_id, page, note.message.clone()),
            None => Warning::unit(&unit.unit_id, note.message.clone()),
        });
    }
    if !extraction.pages.iter().any(|p| p.accepted) {
        log::warn!("unit {}: no balance summary page accepted in {}", unit.unit_id, document.name());
    }
    extraction
}

/// Batch-wide totals over successfully reconciled units.
pub fn summarize(units: &[UnitResult]) -> BatchSummary {
    let total_ledger = round2(units.iter().map(|u| u.total_ledger).sum());
    let total_statement = round2(units.iter().map(|u| u.total_statement).sum());
    BatchSummary {
        units: units.len(),
        units_with_divergence: units.iter().filter(|u| u.has_divergence).count(),
        units_skipped: 0,
        total_ledger,
        total_statement,
        total_difference: round2(total_statement - total_ledger),
    }
}
