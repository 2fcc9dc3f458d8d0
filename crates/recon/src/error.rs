use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// Reference source missing, unreadable, or not a two-column table. Fatal to the run.
    ReferenceLoad(String),
    /// A unit's ledger sheet could not be read. The unit is skipped.
    UnitExtraction { unit: String, message: String },
    /// Text extraction or rendering failed for one statement page.
    PageParse { page: usize, message: String },
    /// OCR engine failure (orientation, rotation or recognition).
    Ocr(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad column layout, negative tolerance, etc.).
    ConfigValidation(String),
    /// IO error (file read, external tool missing, etc.).
    Io(String),
}

impl ReconError {
    /// Only a broken reference source stops the whole batch.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::ReferenceLoad(_))
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceLoad(msg) => write!(f, "reference table load error: {msg}"),
            Self::UnitExtraction { unit, message } => {
                write!(f, "unit '{unit}': ledger extraction failed: {message}")
            }
            Self::PageParse { page, message } => write!(f, "page {page}: {message}"),
            Self::Ocr(msg) => write!(f, "OCR error: {msg}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
