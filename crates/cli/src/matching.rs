//! Unit ↔ statement document association, and the file-backed
//! [`UnitInputs`] the `run` command hands to the batch.
//!
//! A unit is a ledger sheet. Its identifier is the longest digit run in the
//! sheet name ("UG 160001" → "160001"); its statement is the PDF in the
//! statements directory whose file name carries that same digit run as a
//! whole run ("extrato_160001_2024.pdf" matches, "1600012.pdf" does not).

use std::fs;
use std::path::{Path, PathBuf};

use assetrecon_io::{csv, xlsx, PdfDocument};
use assetrecon_recon::{Grid, PageSource, ReconError, UnitInputs, UnitSpec};

// ============================================================================
// Matching rule
// ============================================================================

fn digit_runs(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_ascii_digit()).filter(|run| !run.is_empty())
}

/// Longest digit run of the sheet name (first one on ties), or the trimmed
/// sheet name when it has no digits.
pub fn unit_id(sheet_name: &str) -> String {
    let mut best: Option<&str> = None;
    for run in digit_runs(sheet_name) {
        if best.map_or(true, |b| run.len() > b.len()) {
            best = Some(run);
        }
    }
    best.unwrap_or_else(|| sheet_name.trim()).to_string()
}

fn matches_document(unit_id: &str, path: &Path) -> bool {
    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
        return false;
    };
    if unit_id.chars().all(|c| c.is_ascii_digit()) {
        digit_runs(&stem).any(|run| run == unit_id)
    } else {
        stem.trim().eq_ignore_ascii_case(unit_id)
    }
}

/// First matching document in `documents` (expected sorted by name).
pub fn find_document<'a>(unit_id: &str, documents: &'a [PathBuf]) -> Option<&'a PathBuf> {
    let mut found = documents.iter().filter(|p| matches_document(unit_id, p));
    let first = found.next()?;
    let others = found.count();
    if others > 0 {
        log::warn!(
            "unit {unit_id}: {} documents match, using {}",
            others + 1,
            first.display()
        );
    }
    Some(first)
}

/// PDF files directly under `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("cannot read statements directory {}: {e}", dir.display()))?;
    let mut documents: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    documents.sort();
    Ok(documents)
}

// ============================================================================
// File-backed inputs
// ============================================================================

/// Where the key → label table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    /// A workbook sheet; `None` means the first sheet.
    Sheet { path: PathBuf, sheet: Option<String> },
    /// A delimited text file.
    Delimited(PathBuf),
}

impl ReferenceSource {
    /// Pick the reader by extension. Without an explicit file the reference
    /// is the `default_sheet` of the ledger workbook.
    pub fn resolve(
        reference: Option<&Path>,
        sheet: Option<&str>,
        ledger: &Path,
        default_sheet: &str,
    ) -> Self {
        match reference {
            Some(path) if is_delimited(path) => Self::Delimited(path.to_path_buf()),
            Some(path) => Self::Sheet { path: path.to_path_buf(), sheet: sheet.map(str::to_string) },
            None => Self::Sheet {
                path: ledger.to_path_buf(),
                sheet: Some(sheet.unwrap_or(default_sheet).to_string()),
            },
        }
    }

    fn load(&self) -> Result<Grid, String> {
        match self {
            Self::Sheet { path, sheet } => xlsx::read_sheet(path, sheet.as_deref()),
            Self::Delimited(path) => csv::import(path),
        }
    }
}

fn is_delimited(path: &Path) -> bool {
    path.extension()
        .map(|e| matches!(e.to_string_lossy().to_ascii_lowercase().as_str(), "csv" | "tsv" | "txt"))
        .unwrap_or(false)
}

/// Ledger workbook + statements directory + reference source.
///
/// Sheets are read one at a time so a corrupt sheet only costs its own unit.
pub struct WorkbookInputs {
    ledger: PathBuf,
    reference: ReferenceSource,
    documents: Vec<PathBuf>,
}

impl WorkbookInputs {
    pub fn new(ledger: &Path, reference: ReferenceSource, statements: Option<&Path>) -> Result<Self, String> {
        if !ledger.is_file() {
            return Err(format!("ledger workbook not found: {}", ledger.display()));
        }
        let documents = match statements {
            Some(dir) => list_documents(dir)?,
            None => Vec::new(),
        };
        log::info!("{} statement document(s) available", documents.len());
        Ok(Self { ledger: ledger.to_path_buf(), reference, documents })
    }

    pub fn documents(&self) -> &[PathBuf] {
        &self.documents
    }
}

impl UnitInputs for WorkbookInputs {
    fn reference(&self) -> Result<Grid, ReconError> {
        self.reference.load().map_err(ReconError::ReferenceLoad)
    }

    fn units(&self) -> Result<Vec<UnitSpec>, ReconError> {
        let names = xlsx::sheet_names(&self.ledger).map_err(ReconError::Io)?;
        Ok(names
            .into_iter()
            .map(|sheet_name| UnitSpec { unit_id: unit_id(&sheet_name), sheet_name })
            .collect())
    }

    fn ledger_sheet(&self, unit: &UnitSpec) -> Result<Grid, ReconError> {
        xlsx::read_sheet(&self.ledger, Some(&unit.sheet_name)).map_err(|message| {
            ReconError::UnitExtraction { unit: unit.unit_id.clone(), message }
        })
    }

    fn statement<'a>(&'a self, unit: &UnitSpec) -> Result<Option<Box<dyn PageSource + 'a>>, ReconError> {
        match find_document(&unit.unit_id, &self.documents) {
            Some(path) => {
                let document = PdfDocument::open(path)?;
                Ok(Some(Box::new(document)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/statements").join(n)).collect()
    }

    #[test]
    fn unit_id_is_longest_digit_run() {
        assert_eq!(unit_id("UG 160001"), "160001");
        assert_eq!(unit_id("2024 UG 160001"), "160001");
        assert_eq!(unit_id("12-34"), "12");
        assert_eq!(unit_id("  Almoxarifado "), "Almoxarifado");
    }

    #[test]
    fn document_must_carry_whole_digit_run() {
        let docs = paths(&["1600012.pdf", "extrato_160001_2024.pdf", "160002.pdf"]);
        assert_eq!(find_document("160001", &docs), Some(&docs[1]));
        assert_eq!(find_document("16000", &docs), None);
    }

    #[test]
    fn first_of_several_matches_wins() {
        let docs = paths(&["a 160001.pdf", "b 160001.pdf"]);
        assert_eq!(find_document("160001", &docs), Some(&docs[0]));
    }

    #[test]
    fn non_numeric_unit_matches_stem_exactly() {
        let docs = paths(&["almoxarifado.pdf", "almoxarifado central.pdf"]);
        assert_eq!(find_document("Almoxarifado", &docs), Some(&docs[0]));
    }

    #[test]
    fn reference_source_by_extension() {
        let ledger = Path::new("ledger.xlsx");
        assert_eq!(
            ReferenceSource::resolve(Some(Path::new("matriz.CSV")), None, ledger, "MATRIZ"),
            ReferenceSource::Delimited(PathBuf::from("matriz.CSV"))
        );
        assert_eq!(
            ReferenceSource::resolve(Some(Path::new("matriz.xlsx")), None, ledger, "MATRIZ"),
            ReferenceSource::Sheet { path: PathBuf::from("matriz.xlsx"), sheet: None }
        );
        assert_eq!(
            ReferenceSource::resolve(None, None, ledger, "MATRIZ"),
            ReferenceSource::Sheet { path: PathBuf::from("ledger.xlsx"), sheet: Some("MATRIZ".into()) }
        );
    }

    #[test]
    fn only_pdfs_are_listed_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_160002.pdf", "a_160001.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.pdf")).unwrap();
        let docs = list_documents(dir.path()).unwrap();
        let names: Vec<String> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a_160001.PDF", "b_160002.pdf"]);
    }

    proptest! {
        #[test]
        fn unit_finds_document_named_after_it(
            prefix in "[A-Z ]{0,6}",
            id in "[1-9][0-9]{2,7}",
            stem in "[a-z_]{0,6}",
        ) {
            let sheet = format!("{prefix}{id}");
            let docs = paths(&[format!("{stem}{id}.pdf").as_str(), format!("{stem}{id}0.pdf").as_str()]);
            prop_assert_eq!(unit_id(&sheet), id.clone());
            prop_assert_eq!(find_document(&id, &docs), Some(&docs[0]));
        }
    }
}
