use std::collections::BTreeMap;

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::QueriesArgs,
    data::delta_pct,
    frame::Table,
    io_utils, loader,
    report,
    schema::{SourceSchema, headers},
    table,
};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryLine {
    pub subject_id: String,
    pub search_phrase: Option<String>,
    pub query_count: Option<f64>,
    pub query_count_prev: Option<f64>,
    pub order_count: Option<f64>,
    pub order_count_prev: Option<f64>,
    pub cart_conversion_pct: Option<f64>,
    pub order_conversion_pct: Option<f64>,
}

/// Reads query lines from a table prepared with [`SourceSchema::queries`].
pub fn query_lines(table: &Table) -> Vec<QueryLine> {
    (0..table.row_count())
        .filter_map(|row| {
            Some(QueryLine {
                subject_id: table.get(row, headers::SUBJECT).as_key()?,
                search_phrase: table.get(row, headers::SEARCH_PHRASE).as_key(),
                query_count: table.get(row, headers::QUERY_COUNT).as_number(),
                query_count_prev: table.get(row, headers::QUERY_COUNT_PREV).as_number(),
                order_count: table.get(row, headers::ORDER_COUNT).as_number(),
                order_count_prev: table.get(row, headers::ORDER_COUNT_PREV).as_number(),
                cart_conversion_pct: table.get(row, headers::CART_CONVERSION).as_number(),
                order_conversion_pct: table.get(row, headers::ORDER_CONVERSION).as_number(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectQueries {
    pub subject_id: String,
    pub query_count: u64,
}

/// Sums query volume per subject. Subjects without lines are absent.
pub fn aggregate_queries(lines: &[QueryLine]) -> Vec<SubjectQueries> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for line in lines {
        *totals.entry(line.subject_id.as_str()).or_insert(0.0) += line.query_count.unwrap_or(0.0);
    }
    totals
        .into_iter()
        .map(|(subject, total)| SubjectQueries {
            subject_id: subject.to_string(),
            query_count: to_count(total),
        })
        .collect()
}

pub(crate) fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDetail {
    pub search_phrase: Option<String>,
    pub query_count: Option<f64>,
    pub query_count_prev: Option<f64>,
    pub query_delta_pct: Option<f64>,
    pub order_count: Option<f64>,
    pub order_count_prev: Option<f64>,
    pub order_delta_pct: Option<f64>,
    pub cart_conversion_pct: Option<f64>,
    pub order_conversion_pct: Option<f64>,
}

/// Query rows of one subject with period-over-period deltas, most ordered first.
pub fn query_details(lines: &[QueryLine], subject_id: &str) -> Vec<QueryDetail> {
    let mut details = lines
        .iter()
        .filter(|line| line.subject_id == subject_id)
        .map(|line| QueryDetail {
            search_phrase: line.search_phrase.clone(),
            query_count: line.query_count,
            query_count_prev: line.query_count_prev,
            query_delta_pct: delta_pct(line.query_count, line.query_count_prev),
            order_count: line.order_count,
            order_count_prev: line.order_count_prev,
            order_delta_pct: delta_pct(line.order_count, line.order_count_prev),
            cart_conversion_pct: line.cart_conversion_pct,
            order_conversion_pct: line.order_conversion_pct,
        })
        .collect::<Vec<_>>();
    // Stable sort: ties keep sheet order, missing counts go last.
    details.sort_by(|a, b| {
        let left = a.order_count.unwrap_or(f64::NEG_INFINITY);
        let right = b.order_count.unwrap_or(f64::NEG_INFINITY);
        right.total_cmp(&left)
    });
    details
}

pub fn execute(args: &QueriesArgs) -> Result<()> {
    let options = loader::ReadOptions::from_labels(args.delimiter, args.input_encoding.as_deref())?;
    let raw = loader::load_queries(&args.queries, &options)?;
    let lines = query_lines(&SourceSchema::queries().prepare(&raw));
    let subject = args.subject.trim();
    let mut details = query_details(&lines, subject);
    if details.is_empty() {
        info!("No search queries recorded for subject '{subject}'");
        return Ok(());
    }
    if let Some(limit) = args.limit {
        details.truncate(limit);
    }

    let (headers, rows) = report::query_detail_table(&details);
    if let Some(path) = args.output.as_deref() {
        let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
        report::write_csv(path, &headers, &report::query_detail_records(&details), None, encoding)
            .with_context(|| format!("Exporting query detail to {path:?}"))?;
        info!("Wrote {} query row(s) to {:?}", details.len(), path);
    } else {
        table::print_table(&headers, &rows);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(subject: &str, phrase: &str, queries: Option<f64>, orders: Option<f64>) -> QueryLine {
        QueryLine {
            subject_id: subject.to_string(),
            search_phrase: Some(phrase.to_string()),
            query_count: queries,
            query_count_prev: None,
            order_count: orders,
            order_count_prev: None,
            cart_conversion_pct: None,
            order_conversion_pct: None,
        }
    }

    #[test]
    fn aggregate_sums_per_subject_and_ignores_missing_counts() {
        let lines = vec![
            line("Shoes", "sneakers", Some(60_000.0), None),
            line("Shoes", "boots", Some(40_000.0), None),
            line("Shoes", "heels", None, None),
            line("Hats", "cap", Some(5.0), None),
        ];
        let aggregated = aggregate_queries(&lines);
        assert_eq!(
            aggregated,
            vec![
                SubjectQueries {
                    subject_id: "Hats".into(),
                    query_count: 5
                },
                SubjectQueries {
                    subject_id: "Shoes".into(),
                    query_count: 100_000
                },
            ]
        );
    }

    #[test]
    fn details_sort_by_orders_and_compute_deltas() {
        let mut popular = line("Shoes", "sneakers", Some(150.0), Some(30.0));
        popular.query_count_prev = Some(100.0);
        popular.order_count_prev = Some(0.0);
        let lines = vec![
            line("Shoes", "heels", Some(10.0), None),
            line("Shoes", "boots", Some(20.0), Some(3.0)),
            popular,
            line("Hats", "cap", Some(5.0), Some(100.0)),
        ];

        let details = query_details(&lines, "Shoes");
        let phrases = details
            .iter()
            .map(|d| d.search_phrase.as_deref().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(phrases, vec!["sneakers", "boots", "heels"]);
        assert_eq!(details[0].query_delta_pct, Some(50.0));
        assert_eq!(details[0].order_delta_pct, Some(3000.0));
        assert_eq!(details[1].query_delta_pct, None);
    }

    #[test]
    fn details_for_unknown_subject_are_empty() {
        assert!(query_details(&[line("Hats", "cap", None, None)], "Shoes").is_empty());
    }
}
