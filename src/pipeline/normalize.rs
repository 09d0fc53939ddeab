//! Canonical forms for amount and date values.
//!
//! Both functions are idempotent: feeding a canonical value back in returns
//! it unchanged. Text fields have no canonical form and pass through
//! [`normalize`] untouched.
//!
//! | Type   | Canonical form            | Example                       |
//! |--------|---------------------------|-------------------------------|
//! | amount | two decimals, no grouping | `"$1,234.5"` → `"1234.50"`    |
//! | date   | ISO `YYYY-MM-DD`          | `"01/02/2020"` → `"2020-01-02"` |

use crate::error::NormalizeError;
use crate::fields::FieldType;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Output format of [`normalize_date`].
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted date layouts, tried in order; the first that parses wins.
///
/// Month-first precedes day-first, so `01/02/2020` is the 2nd of January.
/// The canonical layout comes first so canonical input round-trips.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%d/%m/%y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d-%b-%Y",
];

/// Parsed years outside this window are rejected so that `%Y` cannot
/// swallow a two-digit year (`01/02/20` would otherwise be year 20).
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP"];
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

static RE_PLAIN_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());

/// Normalise `value` according to `ty`.
pub fn normalize(value: &str, ty: FieldType) -> Result<String, NormalizeError> {
    match ty {
        FieldType::Text => Ok(value.to_string()),
        FieldType::Amount => normalize_amount(value),
        FieldType::Date => normalize_date(value),
    }
}

/// Strip currency markers, grouping separators and whitespace, then round
/// half-up to exactly two decimals. `(12.00)` is read as `-12.00`.
///
/// Rounding works on the digits themselves, so amounts of any length keep
/// every significant digit.
pub fn normalize_amount(value: &str) -> Result<String, NormalizeError> {
    let err = || NormalizeError::Amount {
        value: value.to_string(),
    };

    let mut s = value.trim().to_string();
    let negative_parens = s.starts_with('(') && s.ends_with(')') && s.len() > 2;
    if negative_parens {
        s = s[1..s.len() - 1].to_string();
    }
    for code in CURRENCY_CODES {
        s = s.replace(code, "");
    }
    let mut cleaned: String = s
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    if negative_parens && !cleaned.starts_with('-') {
        cleaned.insert(0, '-');
    }

    if !RE_PLAIN_NUMBER.is_match(&cleaned) {
        return Err(err());
    }
    Ok(round_to_cents(&cleaned))
}

/// Round a string matching [`RE_PLAIN_NUMBER`] to two decimals.
fn round_to_cents(number: &str) -> String {
    let (negative, unsigned) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let round_up = fraction.as_bytes().get(2).is_some_and(|d| *d >= b'5');
    // Amount in cents, most significant digit first.
    let mut cents: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes().chain(std::iter::repeat(b'0')).take(2))
        .map(|d| d - b'0')
        .collect();
    if round_up {
        let mut carry = true;
        for digit in cents.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            cents.insert(0, 1);
        }
    }

    let (whole, fraction) = cents.split_at(cents.len() - 2);
    let first_significant = whole.iter().position(|d| *d != 0).unwrap_or(whole.len());
    let whole = &whole[first_significant..];

    let mut out = String::with_capacity(whole.len() + 4);
    // -0.00 and 0.00 are the same amount
    if negative && cents.iter().any(|d| *d != 0) {
        out.push('-');
    }
    if whole.is_empty() {
        out.push('0');
    }
    out.extend(whole.iter().map(|d| char::from(b'0' + d)));
    out.push('.');
    out.extend(fraction.iter().map(|d| char::from(b'0' + d)));
    out
}

/// Parse with the first matching entry of [`DATE_FORMATS`] and emit
/// [`CANONICAL_DATE_FORMAT`].
pub fn normalize_date(value: &str) -> Result<String, NormalizeError> {
    let s = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(s, fmt)
                .ok()
                .filter(|d| PLAUSIBLE_YEARS.contains(&d.year()))
        })
        .map(|d| d.format(CANONICAL_DATE_FORMAT).to_string())
        .ok_or_else(|| NormalizeError::Date {
            value: value.to_string(),
        })
}
