//! Value normalization: turns heterogeneous cell content into canonical
//! numbers, code strings and grouping keys.
//!
//! Every function here is total. Source sheets are known to be dirty, so a
//! value that cannot be understood degrades to `0.0` (amounts) or
//! [`NormalizedCode::Invalid`] (codes) instead of failing the row.

use crate::model::{Cell, NormalizedCode};

/// Convert a cell to a number. Numbers pass through; text goes through
/// [`text_to_number`]; anything else is `0.0`.
pub fn to_number(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) if n.is_finite() => *n,
        Cell::Text(s) => text_to_number(s),
        _ => 0.0,
    }
}

/// Parse a locale-formatted amount string.
///
/// The decimal separator is decided from the tail of the string:
/// - both `,` and `.` present: whichever comes last is the decimal separator
///   (`1.234,56` and `1,234.56` are both 1234.56)
/// - only `,`: a single comma is decimal (`500,00`), several are grouping
/// - only `.`: a single dot is decimal, several are grouping (`1.234.567`)
///
/// Parenthesized and trailing-minus amounts are negative. Returns `0.0` when
/// nothing parseable remains.
pub fn text_to_number(raw: &str) -> f64 {
    let mut s: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '“' | '”'))
        .collect::<String>()
        .trim()
        .to_string();

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = s[1..s.len() - 1].trim().to_string();
    }
    if s.ends_with('-') && s.len() > 1 {
        negative = !negative;
        s.pop();
    }

    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');
    let canonical = match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => s.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => s.replace(',', ""),
        (Some(_), None) => {
            if s.matches(',').count() == 1 {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (None, Some(_)) => {
            if s.matches('.').count() > 1 {
                s.replace('.', "")
            } else {
                s
            }
        }
        (None, None) => s,
    };

    let digits: String = canonical
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();

    match digits.parse::<f64>() {
        Ok(n) if n.is_finite() => {
            if negative {
                -n
            } else {
                n
            }
        }
        _ => 0.0,
    }
}

/// Stringify a cell for display: trimmed text, integral numbers without a
/// fractional part.
pub fn to_display_string(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{n}")
            }
        }
        Cell::Text(s) => s.trim().to_string(),
        Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
    }
}

/// Stringify a code cell: trimmed, with a single trailing `.0` removed
/// (integer codes stored as floats come back as `123110703.0`).
pub fn to_clean_code_string(cell: &Cell) -> String {
    let s = to_display_string(cell);
    match s.strip_suffix(".0") {
        Some(stripped) => stripped.to_string(),
        None => s,
    }
}

/// Coerce a code cell to an integer code, or `Invalid`.
pub fn normalize_code(cell: &Cell) -> NormalizedCode {
    match cell {
        Cell::Number(n) => float_code(*n),
        Cell::Text(_) => {
            let clean = to_clean_code_string(cell);
            if let Ok(n) = clean.parse::<i64>() {
                NormalizedCode::Numeric(n)
            } else {
                clean.parse::<f64>().map(float_code).unwrap_or(NormalizedCode::Invalid)
            }
        }
        Cell::Empty | Cell::Bool(_) => NormalizedCode::Invalid,
    }
}

fn float_code(n: f64) -> NormalizedCode {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        NormalizedCode::Numeric(n as i64)
    } else {
        NormalizedCode::Invalid
    }
}

/// Ledger grouping key: the last two characters of the clean code, read as
/// an integer. Shorter or non-numeric tails map to `0`.
///
/// This is deliberately lossy. Codes sharing their last two digits (`100`
/// and `200` both give `0`) land in the same bucket; that mirrors how the
/// statement side keys its balances and is the comparison the business
/// performs.
pub fn to_group_key(clean_code: &str) -> i64 {
    let chars: Vec<char> = clean_code.chars().collect();
    if chars.len() < 2 {
        return 0;
    }
    let tail = &chars[chars.len() - 2..];
    if !tail.iter().all(|c| c.is_ascii_digit()) {
        return 0;
    }
    tail.iter().collect::<String>().parse().unwrap_or(0)
}

/// Round to 2 decimal places, never yielding `-0.0`.
pub fn round2(x: f64) -> f64 {
    let r = (x * 100.0).round() / 100.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}
