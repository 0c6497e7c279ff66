//! Display formatting and export of analysis results.
//!
//! The display table formats numbers for reading (grouped digits, `—` for
//! empty values). Exports carry the same columns with raw numbers so that the
//! file can be loaded back into a spreadsheet and recalculated.

use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;

use crate::{
    frame::Cell,
    io_utils,
    pipeline::AnalysisRow,
    queries::QueryDetail,
    recommend::Recommendation,
    schema::headers,
    table::Align,
};

// Headers stay within windows-1251: currency is spelled out and deltas are
// worded rather than written with `Δ`.

pub const SUBJECT_COLUMNS: &[&str] = &[
    headers::SUBJECT,
    "Юрлица",
    "Выручка, руб.",
    headers::QUERY_COUNT,
    headers::MONOPOLIZATION,
    headers::SELLERS_WITH_ORDERS,
    "Мои заказы, руб.",
    "Моя доля рынка, %",
    "Мой выкуп, %",
    "Рекомендация",
];

pub const QUERY_DETAIL_COLUMNS: &[&str] = &[
    headers::SEARCH_PHRASE,
    headers::QUERY_COUNT,
    "Запросов ранее",
    "Изменение запросов, %",
    headers::ORDER_COUNT,
    "Заказов ранее",
    "Изменение заказов, %",
    headers::CART_CONVERSION,
    headers::ORDER_CONVERSION,
];

/// Integer with space-grouped thousands; zero and missing render as `—`.
pub fn format_number(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite() && *v != 0.0) else {
        return "—".to_string();
    };
    let digits = (value.trunc() as i64).unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        grouped.push('-');
    }
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_pct(value: Option<f64>, places: usize) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{value:.places$}"),
        _ => "—".to_string(),
    }
}

/// Label without the leading emoji, for files consumed outside a terminal.
pub fn plain_label(recommendation: Recommendation) -> &'static str {
    let label = recommendation.label();
    label
        .split_once(' ')
        .map_or(label, |(_, rest)| rest)
}

fn column_headers(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|column| column.to_string()).collect()
}

pub fn subject_table(rows: &[AnalysisRow]) -> (Vec<String>, Vec<Vec<String>>, Vec<Align>) {
    let formatted = rows
        .iter()
        .map(|row| {
            let s = &row.subject;
            vec![
                s.subject_id.clone(),
                s.legal_entities.clone(),
                format_number(s.revenue),
                format_number(Some(s.query_count as f64)),
                format_pct(s.monopolization_pct, 1),
                s.seller_count_with_orders
                    .map_or_else(|| "—".to_string(), |count| count.to_string()),
                format_number(Some(s.my_orders_amount)),
                format_pct(s.my_market_share_pct, 2),
                format_pct(Some(s.my_buyout_pct), 2),
                row.recommendation.label().to_string(),
            ]
        })
        .collect();
    let mut aligns = vec![Align::Right; SUBJECT_COLUMNS.len()];
    aligns[0] = Align::Left;
    aligns[1] = Align::Left;
    aligns[SUBJECT_COLUMNS.len() - 1] = Align::Left;
    (column_headers(SUBJECT_COLUMNS), formatted, aligns)
}

fn number(value: Option<f64>) -> Cell {
    value.map_or(Cell::Missing, Cell::Number)
}

pub fn subject_records(rows: &[AnalysisRow]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|row| {
            let s = &row.subject;
            vec![
                Cell::Text(s.subject_id.clone()),
                Cell::Text(s.legal_entities.clone()),
                number(s.revenue),
                Cell::Number(s.query_count as f64),
                number(s.monopolization_pct),
                number(s.seller_count_with_orders.map(|count| count as f64)),
                Cell::Number(s.my_orders_amount),
                number(s.my_market_share_pct),
                Cell::Number(s.my_buyout_pct),
                Cell::Text(plain_label(row.recommendation).to_string()),
            ]
        })
        .collect()
}

pub fn query_detail_table(details: &[QueryDetail]) -> (Vec<String>, Vec<Vec<String>>) {
    let rows = details
        .iter()
        .map(|d| {
            vec![
                d.search_phrase.clone().unwrap_or_else(|| "—".to_string()),
                format_number(d.query_count),
                format_number(d.query_count_prev),
                format_pct(d.query_delta_pct, 1),
                format_number(d.order_count),
                format_number(d.order_count_prev),
                format_pct(d.order_delta_pct, 1),
                format_pct(d.cart_conversion_pct, 1),
                format_pct(d.order_conversion_pct, 1),
            ]
        })
        .collect();
    (column_headers(QUERY_DETAIL_COLUMNS), rows)
}

pub fn query_detail_records(details: &[QueryDetail]) -> Vec<Vec<Cell>> {
    details
        .iter()
        .map(|d| {
            vec![
                d.search_phrase.clone().map_or(Cell::Missing, Cell::Text),
                number(d.query_count),
                number(d.query_count_prev),
                number(d.query_delta_pct),
                number(d.order_count),
                number(d.order_count_prev),
                number(d.order_delta_pct),
                number(d.cart_conversion_pct),
                number(d.order_conversion_pct),
            ]
        })
        .collect()
}

pub fn write_csv(
    path: &Path,
    headers: &[String],
    records: &[Vec<Cell>],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<()> {
    let delimiter = io_utils::resolve_output_delimiter(
        Some(path),
        delimiter,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    let mut writer = io_utils::open_csv_writer(Some(path), delimiter, encoding)?;
    writer
        .write_record(headers)
        .context("Writing export headers")?;
    for (idx, record) in records.iter().enumerate() {
        writer
            .write_record(record.iter().map(|cell| cell.to_string()))
            .with_context(|| format!("Writing export row {}", idx + 1))?;
    }
    writer.flush().context("Flushing export")?;
    Ok(())
}

pub fn write_json(path: &Path, rows: &[AnalysisRow]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), rows).context("Writing analysis JSON")
}

/// Writes JSON for `.json` paths and delimited text otherwise.
pub fn export(
    path: &Path,
    rows: &[AnalysisRow],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        write_json(path, rows)
    } else {
        write_csv(
            path,
            &column_headers(SUBJECT_COLUMNS),
            &subject_records(rows),
            delimiter,
            encoding,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_groups_thousands_and_hides_zero() {
        assert_eq!(format_number(Some(1_234_567.89)), "1 234 567");
        assert_eq!(format_number(Some(999.0)), "999");
        assert_eq!(format_number(Some(-12_500.0)), "-12 500");
        assert_eq!(format_number(Some(0.0)), "—");
        assert_eq!(format_number(None), "—");
    }

    #[test]
    fn format_pct_keeps_requested_places() {
        assert_eq!(format_pct(Some(4.0), 2), "4.00");
        assert_eq!(format_pct(Some(-3.25), 1), "-3.2");
        assert_eq!(format_pct(None, 2), "—");
    }

    #[test]
    fn export_headers_fit_windows_1251() {
        for header in SUBJECT_COLUMNS.iter().chain(QUERY_DETAIL_COLUMNS) {
            let (_, _, had_errors) = encoding_rs::WINDOWS_1251.encode(header);
            assert!(!had_errors, "{header} is not encodable");
        }
    }

    #[test]
    fn plain_labels_drop_the_emoji() {
        assert_eq!(plain_label(Recommendation::Enter), "Вход");
        assert_eq!(plain_label(Recommendation::ExitReview), "Выход / Анализ");
        assert_eq!(plain_label(Recommendation::Wait), "Не сейчас");
    }
}
