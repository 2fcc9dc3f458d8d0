//! `assetrecon-recon`: ledger vs. statement asset balance reconciliation.
//!
//! Pure engine crate: receives grids and page sources through traits,
//! returns per-unit results and an ordered exception report.
//! No filesystem or process I/O.

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod model;
pub mod normalize;
pub mod reference;
pub mod report;
pub mod statement;

pub use batch::{run_batch, BatchRun, UnitInputs, UnitSpec};
pub use config::ReconConfig;
pub use engine::reconcile;
pub use error::ReconError;
pub use model::{BatchReport, Cell, Grid, UnitResult, Warning};
pub use reference::ReferenceTable;
pub use report::{ReportRecord, ReportRenderer};
pub use statement::{OcrEngine, PageImage, PageSource};
