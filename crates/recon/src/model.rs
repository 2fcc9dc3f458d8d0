use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input grid
// ---------------------------------------------------------------------------

/// Raw content of one spreadsheet cell, before any coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// One sheet's raw row/column grid. Rows may be ragged.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at (row, col), `Cell::Empty` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

// ---------------------------------------------------------------------------
// Ledger side
// ---------------------------------------------------------------------------

/// Code column after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedCode {
    Numeric(i64),
    Invalid,
}

impl NormalizedCode {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightLevel {
    Critical,
    Notice,
}

impl std::fmt::Display for HighlightLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Notice => write!(f, "notice"),
        }
    }
}

/// One data row of a unit's sheet, after cleanup and label resolution.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRecord {
    /// 1-based row number in the source sheet.
    pub row: usize,
    pub raw_code: String,
    pub normalized_code: NormalizedCode,
    pub value: f64,
    pub original_label: String,
    pub resolved_label: String,
    pub group_key: i64,
    pub internal_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<HighlightLevel>,
}

/// A row whose code is on the watch list and whose value is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionFlag {
    pub row: usize,
    pub code: i64,
    pub label: String,
    pub value: f64,
    pub level: HighlightLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerAggregate {
    pub group_key: i64,
    pub sum_value: f64,
    pub label: String,
    pub record_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionStats {
    pub data_rows: usize,
    pub blank_rows: usize,
    pub invalid_code_rows: usize,
    pub excluded_rows: usize,
    pub internal_stock_rows: usize,
    pub unresolved_labels: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerExtraction {
    pub aggregates: Vec<LedgerAggregate>,
    pub internal_stock_balance: f64,
    /// Post-exclusion records in sheet order, internal-stock rows included.
    pub records: Vec<LedgerRecord>,
    pub flags: Vec<AttentionFlag>,
    pub stats: ExtractionStats,
}

// ---------------------------------------------------------------------------
// Statement side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Digital,
    Ocr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRecord {
    pub page: usize,
    pub group_key: i64,
    pub value: f64,
    pub source: TextSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementAggregate {
    pub group_key: i64,
    pub sum_value: f64,
    pub record_count: usize,
}

/// How a page's text was finally obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "path")]
pub enum PagePath {
    Digital,
    Ocr,
    RotatedOcr { degrees: u16 },
    Failed { reason: String },
}

impl std::fmt::Display for PagePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digital => write!(f, "digital"),
            Self::Ocr => write!(f, "ocr"),
            Self::RotatedOcr { degrees } => write!(f, "ocr (rotated {degrees}°)"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// 1-based page number.
    pub page: usize,
    pub path: PagePath,
    pub accepted: bool,
    pub records: usize,
}

/// A recovered problem while reading a statement document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageNote {
    /// `None` for document-level problems.
    pub page: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementExtraction {
    pub aggregates: Vec<StatementAggregate>,
    pub records: Vec<StatementRecord>,
    pub pages: Vec<PageReport>,
    pub notes: Vec<PageNote>,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Which side(s) of the outer join a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Both,
    LedgerOnly,
    StatementOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationRow {
    pub group_key: i64,
    pub ledger_value: f64,
    pub statement_value: f64,
    pub label: String,
    /// `statement_value - ledger_value`, rounded to 2 decimals.
    pub difference: f64,
    pub divergent: bool,
    pub presence: Presence,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitResult {
    pub unit_id: String,
    pub sheet_name: String,
    pub rows: Vec<ReconciliationRow>,
    pub total_ledger: f64,
    pub total_statement: f64,
    pub total_difference: f64,
    /// Grand difference exceeds the divergence tolerance.
    pub total_divergent: bool,
    pub internal_stock_balance: f64,
    /// Internal stock balance exceeds its epsilon. Informational only.
    pub internal_stock_flagged: bool,
    pub has_divergence: bool,
    pub flags: Vec<AttentionFlag>,
}

impl UnitResult {
    pub fn divergent_rows(&self) -> impl Iterator<Item = &ReconciliationRow> {
        self.rows.iter().filter(|r| r.divergent)
    }
}

// ---------------------------------------------------------------------------
// Batch output
// ---------------------------------------------------------------------------

/// A recovered failure, surfaced next to the report rather than inside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    pub message: String,
}

impl Warning {
    pub fn unit(unit: &str, message: impl Into<String>) -> Self {
        Self { unit: Some(unit.to_string()), page: None, message: message.into() }
    }

    pub fn page(unit: &str, page: usize, message: impl Into<String>) -> Self {
        Self { unit: Some(unit.to_string()), page: Some(page), message: message.into() }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.unit, self.page) {
            (Some(unit), Some(page)) => write!(f, "[{unit} p.{page}] {}", self.message),
            (Some(unit), None) => write!(f, "[{unit}] {}", self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub units: usize,
    pub units_with_divergence: usize,
    pub units_skipped: usize,
    pub total_ledger: f64,
    pub total_statement: f64,
    pub total_difference: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub meta: ReconMeta,
    pub summary: BatchSummary,
    pub units: Vec<UnitResult>,
    pub warnings: Vec<Warning>,
}
