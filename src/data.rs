//! Numeric parsing and the arithmetic policies shared by the aggregators.

use rust_decimal::prelude::{Decimal, FromPrimitive, RoundingStrategy, ToPrimitive};

use crate::frame::{Cell, Table};

const PLACEHOLDER_TOKENS: &[&str] = &["-", "—", "–", "na", "n/a", "nan", "null", "none"];

/// Parses a spreadsheet-exported number.
///
/// Accepts thousands separators (regular, non-breaking and thin spaces, or
/// commas in groups of three), a decimal comma and a trailing `%` or `₽`.
/// Placeholders and non-finite results yield `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || PLACEHOLDER_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }
    let stripped = trimmed
        .trim_end_matches(['%', '₽'])
        .trim_end()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\u{2009}'))
        .collect::<String>();
    let normalized = if comma_is_decimal(&stripped) {
        stripped.replacen(',', ".", 1)
    } else {
        stripped.replace(',', "")
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// A lone comma is a decimal separator unless a dot is present or exactly
/// three digits follow it (`12,345` is twelve thousand).
fn comma_is_decimal(value: &str) -> bool {
    if value.contains('.') || value.matches(',').count() != 1 {
        return false;
    }
    value.split_once(',').is_some_and(|(_, fraction)| {
        !(fraction.len() == 3 && fraction.bytes().all(|b| b.is_ascii_digit()))
    })
}

pub fn coerce_cell(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(value) if value.is_finite() => Cell::Number(*value),
        Cell::Text(text) => parse_number(text).map_or(Cell::Missing, Cell::Number),
        _ => Cell::Missing,
    }
}

/// Converts the named columns to numbers. Columns the table does not have are
/// ignored; unparsable values become [`Cell::Missing`].
pub fn coerce_numeric<S: AsRef<str>>(table: &Table, columns: &[S]) -> Table {
    let mut result = table.clone();
    for name in columns {
        if let Some(idx) = result.column_index(name.as_ref()) {
            result = result.map_column(idx, coerce_cell);
        }
    }
    result
}

/// What a ratio evaluates to when its denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroDenominator {
    /// The ratio is 0.
    Zero,
    /// Divide by 1 instead, i.e. the ratio is the numerator itself.
    DivideByOne,
}

pub fn safe_ratio(numerator: f64, denominator: f64, on_zero: ZeroDenominator) -> f64 {
    if denominator != 0.0 {
        numerator / denominator
    } else {
        match on_zero {
            ZeroDenominator::Zero => 0.0,
            ZeroDenominator::DivideByOne => numerator,
        }
    }
}

/// Rounds half-to-even at `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|decimal| decimal.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven))
        .and_then(|decimal| decimal.to_f64())
        .unwrap_or(value)
}

/// Mean of the present values, 0 when there are none.
pub fn mean_or_zero<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    safe_ratio(sum, count as f64, ZeroDenominator::Zero)
}

/// `(current - previous) / previous * 100`, with a zero previous value
/// dividing by 1, rounded to one decimal.
pub fn delta_pct(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    let (current, previous) = (current?, previous?);
    Some(round_to(
        safe_ratio(current - previous, previous, ZeroDenominator::DivideByOne) * 100.0,
        1,
    ))
}
