//! `assetrecon inspect-statement`: per-page view of how a statement PDF is
//! read, for diagnosing units whose statement side comes out empty.

use std::path::PathBuf;

use serde::Serialize;

use assetrecon_io::{PdfDocument, TesseractOcr};
use assetrecon_recon::model::{PagePath, StatementExtraction};
use assetrecon_recon::statement;
use assetrecon_recon::{OcrEngine, PageSource};

use crate::{load_config, CliError};

#[derive(Serialize)]
struct InspectOutput<'a> {
    document: &'a str,
    ocr_available: bool,
    #[serde(flatten)]
    extraction: &'a StatementExtraction,
}

pub fn cmd_inspect_statement(
    pdf: PathBuf,
    config: Option<PathBuf>,
    no_ocr: bool,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_ref())?;
    let document = PdfDocument::open(&pdf).map_err(|e| CliError::recon(&e))?;
    let tesseract = if no_ocr { None } else { TesseractOcr::detect() };
    let ocr = tesseract.as_ref().map(|t| t as &dyn OcrEngine);

    let extraction = statement::parse(&document, ocr, &config.statement);

    if json {
        let output = InspectOutput {
            document: document.name(),
            ocr_available: ocr.is_some(),
            extraction: &extraction,
        };
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{text}");
    } else {
        print_pages(document.name(), &extraction);
    }

    // A document-level note means not even the page count could be read.
    if let Some(note) = extraction.notes.iter().find(|n| n.page.is_none()) {
        return Err(CliError::parse(format!("{}: {}", document.name(), note.message))
            .with_hint("statement reading needs poppler-utils (pdfinfo, pdftotext, pdftoppm)"));
    }
    Ok(())
}

fn path_label(path: &PagePath) -> String {
    match path {
        PagePath::Failed { .. } => "failed".to_string(),
        other => other.to_string(),
    }
}

fn print_pages(name: &str, extraction: &StatementExtraction) {
    println!("{name}: {} page(s)", extraction.pages.len());
    for page in &extraction.pages {
        let status = if page.accepted { "accepted" } else { "skipped" };
        println!("  page {:>3}  {:<20} {:<8} {} record(s)", page.page, path_label(&page.path), status, page.records);
        for rec in extraction.records.iter().filter(|r| r.page == page.page) {
            println!("             key {:>2}  {:>18.2}", rec.group_key, rec.value);
        }
    }
    for note in &extraction.notes {
        match note.page {
            Some(p) => println!("  note (page {p}): {}", note.message),
            None => println!("  note: {}", note.message),
        }
    }
    if !extraction.aggregates.is_empty() {
        println!("  totals by key:");
        for agg in &extraction.aggregates {
            println!("    key {:>2}  {:>18.2}  ({} line(s))", agg.group_key, agg.sum_value, agg.record_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_path_prints_short_label() {
        assert_eq!(path_label(&PagePath::Failed { reason: "no text".into() }), "failed");
        assert_eq!(path_label(&PagePath::Digital), "digital");
        assert_eq!(path_label(&PagePath::RotatedOcr { degrees: 90 }), "ocr (rotated 90°)");
    }

    #[test]
    fn missing_pdf_is_io_error() {
        let err = cmd_inspect_statement(PathBuf::from("/nonexistent/160001.pdf"), None, true, false)
            .unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_IO);
    }
}
