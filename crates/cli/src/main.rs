// assetrecon CLI - monthly ledger vs. statement asset reconciliation

mod exit_codes;
mod inspect;
mod matching;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use assetrecon_recon::{ReconConfig, ReconError};
use exit_codes::{recon_exit_code, EXIT_CONFIG_INVALID, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "assetrecon")]
#[command(about = "Reconcile ledger asset balances against statement documents")]
#[command(version)]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG still applies)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every unit sheet of a ledger workbook against its statement
    #[command(after_help = "\
Examples:
  assetrecon run --ledger ledger.xlsx --statements pdfs/ --out divergences.xlsx
  assetrecon run --ledger ledger.xlsx --reference matriz.xlsx --statements pdfs/ --json report.json
  assetrecon run --ledger ledger.xlsx --statements pdfs/ --config legacy.toml --annotated annotated.xlsx
  assetrecon run --ledger ledger.xlsx --statements pdfs/ > divergences.csv")]
    Run {
        /// Ledger workbook, one sheet per organizational unit
        #[arg(long)]
        ledger: PathBuf,

        /// Reference table (xlsx/ods/csv). Defaults to the ledger's own reference sheet
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Sheet of the reference workbook to read
        #[arg(long)]
        reference_sheet: Option<String>,

        /// Directory of statement PDFs, matched to units by numeric identifier
        #[arg(long)]
        statements: Option<PathBuf>,

        /// Ruleset TOML (exclusion codes, tolerance, statement heading)
        #[arg(long, env = "ASSETRECON_CONFIG")]
        config: Option<PathBuf>,

        /// Exception report (.xlsx or .csv). Omit for CSV on stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Write the full batch report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write the annotated ledger workbook
        #[arg(long)]
        annotated: Option<PathBuf>,

        /// Never OCR scanned pages, even when tesseract is installed
        #[arg(long)]
        no_ocr: bool,

        /// Suppress the stderr summary and warning list
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check a ruleset TOML without running
    #[command(after_help = "\
Examples:
  assetrecon validate legacy.toml")]
    Validate {
        /// Ruleset TOML file
        config: PathBuf,
    },

    /// Show how each page of a statement PDF is read and what it yields
    #[command(after_help = "\
Examples:
  assetrecon inspect-statement extrato_160001.pdf
  assetrecon inspect-statement extrato_160001.pdf --json")]
    InspectStatement {
        /// Statement PDF
        pdf: PathBuf,

        /// Ruleset TOML (statement heading, OCR settings)
        #[arg(long, env = "ASSETRECON_CONFIG")]
        config: Option<PathBuf>,

        /// Never OCR scanned pages
        #[arg(long)]
        no_ocr: bool,

        /// Print the extraction as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            ledger,
            reference,
            reference_sheet,
            statements,
            config,
            out,
            json,
            annotated,
            no_ocr,
            quiet,
        } => recon::cmd_run(recon::RunArgs {
            ledger,
            reference,
            reference_sheet,
            statements,
            config,
            out,
            json,
            annotated,
            no_ocr,
            quiet,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::InspectStatement { pdf, config, no_ocr, json } => {
            inspect::cmd_inspect_statement(pdf, config, no_ocr, json)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG_INVALID, message: msg.into(), hint: None }
    }

    /// Engine error with its registry exit code.
    pub fn recon(err: &ReconError) -> Self {
        let hint = match err {
            ReconError::ReferenceLoad(_) => {
                Some("check --reference / --reference-sheet; the table needs key and label columns".to_string())
            }
            ReconError::ConfigParse(_) => Some("run `assetrecon validate <config>` for details".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Ruleset from `path`, or the built-in one.
pub fn load_config(path: Option<&PathBuf>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    ReconConfig::from_toml(&text).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
}
