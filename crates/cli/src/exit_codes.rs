//! CLI Exit Code Registry
//!
//! Single source of truth for `assetrecon` exit codes. Scripts wrapping
//! the monthly run branch on these, so they only ever grow.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success, no divergences                                   |
//! | 1    | Run completed, at least one unit has divergences          |
//! | 2    | Usage error (bad arguments, unsupported output extension) |
//! | 3    | I/O error (unreadable input, unwritable output)           |
//! | 4    | Parse error (statement document unreadable)               |
//! | 10   | Configuration file invalid                                |
//! | 11   | Reference table could not be loaded; nothing was run      |

use assetrecon_recon::ReconError;

/// Success - run completed without divergences.
pub const EXIT_SUCCESS: u8 = 0;

/// Divergences found. Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DIVERGENCES: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input could not be read or output could not be written.
pub const EXIT_IO: u8 = 3;

/// Input was read but could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// Config file failed to parse or validate.
pub const EXIT_CONFIG_INVALID: u8 = 10;

/// Reference table failed to load. The only run-fatal engine error.
pub const EXIT_REFERENCE_LOAD: u8 = 11;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ReferenceLoad(_) => EXIT_REFERENCE_LOAD,
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        ReconError::PageParse { .. } | ReconError::Ocr(_) => EXIT_PARSE,
        ReconError::UnitExtraction { .. } | ReconError::Io(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_DIVERGENCES,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_PARSE,
            EXIT_CONFIG_INVALID,
            EXIT_REFERENCE_LOAD,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_codes() {
        assert_eq!(recon_exit_code(&ReconError::ReferenceLoad("x".into())), EXIT_REFERENCE_LOAD);
        assert_eq!(recon_exit_code(&ReconError::ConfigValidation("x".into())), EXIT_CONFIG_INVALID);
        assert_eq!(recon_exit_code(&ReconError::Io("x".into())), EXIT_IO);
        assert_eq!(
            recon_exit_code(&ReconError::PageParse { page: 1, message: "x".into() }),
            EXIT_PARSE
        );
    }
}
