use serde::Deserialize;

use crate::error::ReconError;
use crate::model::HighlightLevel;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section has defaults, so an empty TOML document
/// yields the standard ruleset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub statement: StatementConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Fixed sheet layout plus the code lists applied to ledger rows.
///
/// Column indices are 0-based positions in the raw row. The exclusion set
/// has drifted between ruleset revisions (`44905287` vs `123119910`), which
/// is why it lives here rather than in code.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub header_rows: usize,
    pub code_column: usize,
    pub label_column: usize,
    pub value_column: usize,
    pub exclusion_codes: Vec<i64>,
    pub internal_stock_code: String,
    pub skip_sheets: Vec<String>,
    pub highlights: Vec<HighlightRule>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            header_rows: 7,
            code_column: 0,
            label_column: 1,
            value_column: 2,
            exclusion_codes: vec![123110703, 123110402, 123119910],
            internal_stock_code: "2042".into(),
            skip_sheets: vec!["MATRIZ".into()],
            highlights: vec![
                HighlightRule { code: 123110801, level: HighlightLevel::Critical },
                HighlightRule { code: 123119905, level: HighlightLevel::Notice },
            ],
        }
    }
}

impl LedgerConfig {
    pub fn is_excluded(&self, code: i64) -> bool {
        self.exclusion_codes.contains(&code)
    }

    pub fn highlight_for(&self, code: i64) -> Option<HighlightLevel> {
        self.highlights.iter().find(|h| h.code == code).map(|h| h.level)
    }

    pub fn skips_sheet(&self, name: &str) -> bool {
        self.skip_sheets.iter().any(|s| s.eq_ignore_ascii_case(name.trim()))
    }
}

/// Rows with this code and a non-zero value are surfaced as attention flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HighlightRule {
    pub code: i64,
    pub level: HighlightLevel,
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatementConfig {
    /// Phrase identifying a balance-summary page. Matched case- and
    /// accent-insensitively.
    pub heading: String,
    /// Phrases identifying entry/exit log pages, which are never scanned.
    pub exclusion_markers: Vec<String>,
    /// Digital text shorter than this (trimmed) is treated as unusable.
    pub min_text_chars: usize,
    pub render_dpi: u32,
    pub ocr_language: String,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            heading: "RESUMO DO SALDO POR CONTA".into(),
            exclusion_markers: vec!["RELACAO DE ENTRADAS".into(), "RELACAO DE SAIDAS".into()],
            min_text_chars: 40,
            render_dpi: 300,
            ocr_language: "por".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceConfig {
    /// A row diverges when `|difference| > divergence`.
    pub divergence: f64,
    /// Internal stock balance is noted when `|balance| > internal_stock_epsilon`.
    pub internal_stock_epsilon: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            divergence: 0.05,
            internal_stock_epsilon: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let l = &self.ledger;
        if l.code_column == l.value_column {
            return Err(ReconError::ConfigValidation(format!(
                "code_column and value_column must differ (both {})",
                l.code_column
            )));
        }
        if l.internal_stock_code.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "internal_stock_code must not be empty".into(),
            ));
        }
        for rule in &l.highlights {
            if l.is_excluded(rule.code) {
                log::warn!("highlight code {} is also excluded; it will never be flagged", rule.code);
            }
        }

        let s = &self.statement;
        if s.heading.trim().is_empty() {
            return Err(ReconError::ConfigValidation("statement heading must not be empty".into()));
        }
        if s.exclusion_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "statement exclusion markers must not be empty".into(),
            ));
        }
        if s.render_dpi == 0 {
            return Err(ReconError::ConfigValidation("render_dpi must be positive".into()));
        }

        let t = &self.tolerance;
        if !(t.divergence >= 0.0) || !(t.internal_stock_epsilon >= 0.0) {
            return Err(ReconError::ConfigValidation(format!(
                "tolerances must be non-negative (divergence = {}, internal_stock_epsilon = {})",
                t.divergence, t.internal_stock_epsilon
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
