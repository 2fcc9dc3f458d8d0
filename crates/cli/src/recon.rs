//! `assetrecon run` and `assetrecon validate`.

use std::io::Write;
use std::path::{Path, PathBuf};

use assetrecon_io::csv::CsvReport;
use assetrecon_io::tools::{self, PDFINFO, PDFTOPPM, PDFTOTEXT};
use assetrecon_io::xlsx::XlsxReport;
use assetrecon_io::{write_annotated_ledger, write_report_json, TesseractOcr};
use assetrecon_recon::model::BatchReport;
use assetrecon_recon::report::{self, ReportRenderer};
use assetrecon_recon::{run_batch, OcrEngine};

use crate::exit_codes::EXIT_DIVERGENCES;
use crate::matching::{ReferenceSource, WorkbookInputs};
use crate::{load_config, CliError};

/// Reference sheet looked up in the ledger workbook when `--reference` is absent.
const DEFAULT_REFERENCE_SHEET: &str = "MATRIZ";

pub struct RunArgs {
    pub ledger: PathBuf,
    pub reference: Option<PathBuf>,
    pub reference_sheet: Option<String>,
    pub statements: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub annotated: Option<PathBuf>,
    pub no_ocr: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportFormat {
    Xlsx,
    Csv,
}

fn report_format(out: Option<&Path>) -> Result<ReportFormat, CliError> {
    let Some(path) = out else {
        return Ok(ReportFormat::Csv);
    };
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" => Ok(ReportFormat::Xlsx),
        "csv" => Ok(ReportFormat::Csv),
        other => Err(CliError::args(format!("unsupported report extension \"{other}\""))
            .with_hint("use --out report.xlsx or --out report.csv")),
    }
}

fn renderer(format: ReportFormat) -> Result<Box<dyn ReportRenderer>, CliError> {
    let renderer: Box<dyn ReportRenderer> = match format {
        ReportFormat::Xlsx => Box::new(XlsxReport::new().map_err(|e| CliError::recon(&e))?),
        ReportFormat::Csv => Box::new(CsvReport::new().map_err(|e| CliError::recon(&e))?),
    };
    Ok(renderer)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_ref())?;
    // Fail on a bad --out before spending minutes on OCR.
    let format = report_format(args.out.as_deref())?;

    let reference = ReferenceSource::resolve(
        args.reference.as_deref(),
        args.reference_sheet.as_deref(),
        &args.ledger,
        DEFAULT_REFERENCE_SHEET,
    );
    let inputs = WorkbookInputs::new(&args.ledger, reference, args.statements.as_deref())
        .map_err(CliError::io)?;

    if !inputs.documents().is_empty() {
        let missing = tools::missing(&[PDFINFO, PDFTOTEXT, PDFTOPPM]);
        if !missing.is_empty() && !args.quiet {
            let names: Vec<&str> = missing.iter().map(|t| t.name).collect();
            eprintln!(
                "warning: {} not found; statements will be reported unreadable (install {})",
                names.join(", "),
                missing[0].package,
            );
        }
    }

    let tesseract = if args.no_ocr { None } else { TesseractOcr::detect() };
    let ocr = tesseract.as_ref().map(|t| t as &dyn OcrEngine);

    let run = run_batch(&inputs, ocr, &config).map_err(|e| CliError::recon(&e))?;

    // Report
    let records = report::assemble(&run.report.units, &run.report.summary);
    let bytes = report::render(renderer(format)?, &records).map_err(|e| CliError::recon(&e))?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &bytes)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            if !args.quiet {
                eprintln!("wrote {}", path.display());
            }
        }
        None => {
            std::io::stdout()
                .write_all(&bytes)
                .map_err(|e| CliError::io(e.to_string()))?;
        }
    }

    if let Some(path) = &args.json {
        write_report_json(&run.report, path).map_err(CliError::io)?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(path) = &args.annotated {
        let written = write_annotated_ledger(&run.ledgers, path).map_err(CliError::io)?;
        if !args.quiet {
            eprintln!("wrote {} ({} sheets, {} rows)", path.display(), written.sheets, written.rows);
        }
    }

    if !args.quiet {
        print_summary(&run.report);
    }

    let s = &run.report.summary;
    if s.units_with_divergence > 0 {
        return Err(CliError {
            code: EXIT_DIVERGENCES,
            message: format!("divergences found in {} of {} unit(s)", s.units_with_divergence, s.units),
            hint: None,
        });
    }
    Ok(())
}

/// Human summary to stderr: totals line, then one line per warning.
fn print_summary(report: &BatchReport) {
    let s = &report.summary;
    eprintln!(
        "{} unit(s) reconciled, {} with divergences, {} skipped",
        s.units, s.units_with_divergence, s.units_skipped,
    );
    eprintln!(
        "totals: ledger {:.2}, statement {:.2}, difference {:.2} (tolerance {:.2})",
        s.total_ledger, s.total_statement, s.total_difference, report.meta.tolerance,
    );
    if !report.warnings.is_empty() {
        eprintln!("{} warning(s):", report.warnings.len());
        for warning in &report.warnings {
            eprintln!("  {warning}");
        }
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;
    let l = &config.ledger;
    eprintln!(
        "valid: {} exclusion code(s), {} highlight rule(s), skip sheets [{}]",
        l.exclusion_codes.len(),
        l.highlights.len(),
        l.skip_sheets.join(", "),
    );
    eprintln!(
        "       tolerance {}, heading \"{}\", OCR language {}",
        config.tolerance.divergence, config.statement.heading, config.statement.ocr_language,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_USAGE;

    #[test]
    fn report_format_by_extension() {
        assert_eq!(report_format(None).unwrap(), ReportFormat::Csv);
        assert_eq!(report_format(Some(Path::new("r.XLSX"))).unwrap(), ReportFormat::Xlsx);
        assert_eq!(report_format(Some(Path::new("r.csv"))).unwrap(), ReportFormat::Csv);
        let err = report_format(Some(Path::new("r.pdf"))).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(err.hint.is_some());
    }
}
