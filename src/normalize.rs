//! Cell value normalization: currency, percentages and thousands separators.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Result of normalizing one table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// The cell parsed as a number.
    Number(f64),
    /// The cell could not be interpreted; the original value is kept as-is.
    Raw(Value),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Raw(_) => None,
        }
    }
}

fn decimal_regex() -> &'static Regex {
    static DECIMAL: OnceLock<Regex> = OnceLock::new();
    DECIMAL.get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("decimal regex"))
}

/// Normalize a raw cell into a number, or hand it back untouched.
///
/// Never fails: anything that isn't recognisably numeric comes back as
/// [`CellValue::Raw`].
pub fn normalize(raw: &Value) -> CellValue {
    match raw {
        Value::Number(n) => match n.as_f64() {
            Some(f) => CellValue::Number(f),
            None => CellValue::Raw(raw.clone()),
        },
        Value::String(s) => match normalize_str(s) {
            Some(f) => CellValue::Number(f),
            None => CellValue::Raw(raw.clone()),
        },
        _ => CellValue::Raw(raw.clone()),
    }
}

fn normalize_str(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");

    if let Some(rest) = cleaned.strip_prefix(CURRENCY_SYMBOLS) {
        return parse_decimal(rest.trim_start());
    }

    if let Some(rest) = cleaned.strip_suffix('%') {
        return parse_decimal(rest.trim_end());
    }

    // Plain numerals, but no "inf"/"NaN" from a bare word
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

fn parse_decimal(text: &str) -> Option<f64> {
    if !decimal_regex().is_match(text) {
        return None;
    }
    // Long digit runs overflow to inf
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}
