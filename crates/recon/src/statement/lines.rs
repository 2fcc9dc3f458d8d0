//! Line-level parsing of statement balance tables.
//!
//! A balance line starts with the account's short key, followed by free
//! text and a run of currency columns. The balance the ledger is compared
//! against is the fourth column from the right.

use std::sync::OnceLock;

use regex::Regex;

use crate::normalize::text_to_number;

/// Digital text: well-formed `1.234,56` amounts only.
const STRICT_TOKEN: &str = r"-?\b\d{1,3}(?:\.\d{3})*,\d{2}\b";
/// OCR text: tolerates missing or space-substituted grouping dots and a
/// stray space around the decimal comma.
const LOOSE_TOKEN: &str = r"-?\b\d+(?:[. ]\d{3})*\s?,\s?\d{2}\b";
const LEADING_KEY: &str = r"^\s*(\d+)\s+(.*)$";

/// Column counted from the right that holds the comparable balance.
const VALUE_COLUMN_FROM_RIGHT: usize = 4;

fn strict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STRICT_TOKEN).expect("strict currency pattern"))
}

fn loose_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOOSE_TOKEN).expect("loose currency pattern"))
}

fn key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LEADING_KEY).expect("leading key pattern"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyPattern {
    Strict,
    Loose,
}

impl CurrencyPattern {
    fn regex(self) -> &'static Regex {
        match self {
            Self::Strict => strict_re(),
            Self::Loose => loose_re(),
        }
    }
}

/// Parse one line into `(group_key, value)`.
///
/// Returns `None` when the line does not start with a digit run followed by
/// whitespace, when that run overflows `i64`, or when fewer than four
/// currency tokens follow it.
pub fn parse_line(line: &str, pattern: CurrencyPattern) -> Option<(i64, f64)> {
    let caps = key_re().captures(line)?;
    let key: i64 = caps.get(1)?.as_str().parse().ok()?;
    let rest = caps.get(2)?.as_str();

    let tokens: Vec<&str> = pattern.regex().find_iter(rest).map(|m| m.as_str()).collect();
    if tokens.len() < VALUE_COLUMN_FROM_RIGHT {
        return None;
    }
    let token = tokens[tokens.len() - VALUE_COLUMN_FROM_RIGHT];
    let value = match pattern {
        CurrencyPattern::Strict => text_to_number(token),
        CurrencyPattern::Loose => text_to_number(&token.replace(char::is_whitespace, "")),
    };
    Some((key, value))
}

/// Whether `text` contains at least one well-formed currency amount.
pub fn has_currency_token(text: &str) -> bool {
    strict_re().is_match(text)
}

/// Uppercase, strip Portuguese diacritics and collapse whitespace runs, so
/// headings compare equal regardless of case, accents or layout spacing.
pub fn fold_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        for u in c.to_uppercase() {
            out.push(strip_accent(u));
        }
    }
    out
}

fn strip_accent(c: char) -> char {
    match c {
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ç' => 'C',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_tokens_take_the_first() {
        let line = "45  1.234,56  2.000,00  500,00  300,00";
        assert_eq!(parse_line(line, CurrencyPattern::Strict), Some((45, 1234.56)));
    }

    #[test]
    fn six_tokens_take_fourth_from_last() {
        let line = "45  1.234,56  2.000,00  500,00  300,00  100,00  50,00";
        assert_eq!(parse_line(line, CurrencyPattern::Strict), Some((45, 500.0)));
    }

    #[test]
    fn fewer_than_four_tokens_is_skipped() {
        assert_eq!(parse_line("45  ACOES  1,00  2,00  3,00", CurrencyPattern::Strict), None);
    }

    #[test]
    fn line_must_start_with_digit_run_and_space() {
        assert_eq!(parse_line("A45 1,00 2,00 3,00 4,00", CurrencyPattern::Strict), None);
        assert_eq!(parse_line("45A 1,00 2,00 3,00 4,00", CurrencyPattern::Strict), None);
        assert_eq!(parse_line("1,00 2,00 3,00 4,00 5,00", CurrencyPattern::Strict), None);
        assert_eq!(
            parse_line("   07  X  1,00  2,00  3,00  4,00", CurrencyPattern::Strict),
            Some((7, 1.0))
        );
    }

    #[test]
    fn key_overflow_is_skipped() {
        let line = "99999999999999999999999  1,00  2,00  3,00  4,00";
        assert_eq!(parse_line(line, CurrencyPattern::Strict), None);
    }

    #[test]
    fn negative_amounts() {
        let line = "3  X  -1.500,00  2,00  3,00  4,00";
        assert_eq!(parse_line(line, CurrencyPattern::Strict), Some((3, -1500.0)));
    }

    #[test]
    fn strict_rejects_ungrouped_thousands() {
        // "1234,56" is not a strict token; only three remain
        let line = "3  X  1234,56  2,00  3,00  4,00";
        assert_eq!(parse_line(line, CurrencyPattern::Strict), None);
    }

    #[test]
    fn loose_tolerates_ocr_spacing() {
        let line = "12  FUNDO  1 234,56  2.000 ,00  1234,00  4,00";
        assert_eq!(parse_line(line, CurrencyPattern::Loose), Some((12, 1234.56)));
        let line = "12  FUNDO  9,99  1 234,56  2.000 ,00  1234,00  4,00";
        assert_eq!(parse_line(line, CurrencyPattern::Loose), Some((12, 1234.56)));
    }

    #[test]
    fn currency_detection() {
        assert!(has_currency_token("saldo 1.000,00"));
        assert!(!has_currency_token("page 3 of 10"));
    }

    #[test]
    fn fold_is_case_accent_and_space_insensitive() {
        assert_eq!(fold_text("  Relação   de\tSaídas "), "RELACAO DE SAIDAS");
        assert_eq!(fold_text("Resumo do Saldo"), fold_text("RESUMO  DO  SALDO"));
    }
}
