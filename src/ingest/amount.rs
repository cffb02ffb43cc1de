use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::{AppError, Result};

/// Regex for a currency amount behind `marker`: optional spaces, an integer
/// part (plain digits or `1.234`-style groups), a `.`/`,` separator and
/// exactly two fraction digits.
pub fn amount_regex(marker: &str) -> Result<Regex> {
    let pattern = format!(
        r"{}\s*(?:\d{{1,3}}(?:[.,]\d{{3}})+|\d+)[.,]\d{{2}}",
        regex::escape(marker)
    );
    Regex::new(&pattern).map_err(|e| AppError::Config(format!("bad currency marker '{marker}': {e}")))
}

/// Parse `"R$ 1.234,56"`, `"16,90"`, `"16.9"` or `"16.90"` into a decimal.
///
/// The marker and whitespace are dropped. A final separator followed by one
/// or two digits is the decimal point; every other separator must be followed
/// by exactly three digits (thousands). Anything else, such as `1.2345`, is
/// rejected.
pub fn parse_amount(text: &str, marker: &str) -> Option<Decimal> {
    let stripped = if marker.is_empty() { text.to_string() } else { text.replacen(marker, "", 1) };
    let body: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let mut groups: Vec<&str> = body.split(|c| c == '.' || c == ',').collect();
    let has_frac = groups.len() > 1 && groups.last().is_some_and(|g| (1..=2).contains(&g.len()));
    let frac = if has_frac { groups.pop() } else { None };
    let (head, thousands) = groups.split_first()?;
    if head.is_empty() || thousands.iter().any(|g| g.len() != 3) {
        return None;
    }

    let digits = groups.concat();
    let normalized = match frac {
        Some(frac) => format!("{digits}.{frac}"),
        None => digits,
    };
    Decimal::from_str(&normalized).ok()
}
