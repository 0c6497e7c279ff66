//! End-to-end analysis over one snapshot of the raw tables.
//!
//! [`analyze`] is a pure function of its inputs: raw tables in, classified
//! subject rows out. Filtering by recommendation and sorting are separate
//! steps applied by the caller.

use std::cmp::Ordering;

use clap::ValueEnum;
use itertools::Itertools;
use log::{debug, info};
use serde::Serialize;

use crate::{
    config::AnalysisConfig,
    error::PipelineError,
    join::{self, SubjectRecord},
    loader::RawTables,
    queries,
    recommend::{Recommendation, classify},
    sales::{self, EntitySelection, SalesSelection},
    schema::SourceSchema,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    #[serde(flatten)]
    pub subject: SubjectRecord,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// One row per market subject, in market sheet order.
    pub rows: Vec<AnalysisRow>,
    /// Legal entities seen in the sales data.
    pub entities: Vec<String>,
}

pub fn analyze(raw: &RawTables, config: &AnalysisConfig) -> Result<Analysis, PipelineError> {
    let market = join::market_records(&SourceSchema::market().prepare(&raw.market));
    let query_lines = queries::query_lines(&SourceSchema::queries().prepare(&raw.queries));
    let sales_lines = sales::sales_lines(&SourceSchema::sales().prepare(&raw.sales));
    debug!(
        "Prepared {} market subject(s), {} query line(s), {} sales line(s)",
        market.len(),
        query_lines.len(),
        sales_lines.len()
    );

    let entities = sales::observed_entities(&sales_lines);
    if let EntitySelection::One(entity) = &config.legal_entity
        && !entities.contains(entity)
    {
        return Err(PipelineError::UnknownEntity {
            entity: entity.clone(),
            available: entities.join(", "),
        });
    }

    let query_agg = queries::aggregate_queries(&query_lines);
    let selection = SalesSelection::new(&sales::aggregate_sales(&sales_lines), &config.legal_entity);

    let rows = join::join(&market, &query_agg, &selection)
        .into_iter()
        .map(|subject| AnalysisRow {
            recommendation: classify(&subject, &config.thresholds),
            subject,
        })
        .collect::<Vec<_>>();

    info!(
        "Classified {} subject(s): {}",
        rows.len(),
        rows.iter()
            .counts_by(|row| row.recommendation)
            .into_iter()
            .sorted()
            .map(|(rec, count)| format!("{rec} {count}"))
            .join(", ")
    );
    Ok(Analysis { rows, entities })
}

/// Keeps the rows whose recommendation the configuration accepts.
pub fn select_rows(rows: &[AnalysisRow], config: &AnalysisConfig) -> Vec<AnalysisRow> {
    rows.iter()
        .filter(|row| config.accepts(row.recommendation))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum SortKey {
    Subject,
    Revenue,
    Growth,
    Queries,
    Orders,
    Share,
    Buyout,
    Recommendation,
}

fn compare_optional(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(l), Some(r)) => l.total_cmp(&r),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}

fn compare(left: &AnalysisRow, right: &AnalysisRow, key: SortKey) -> Ordering {
    let (l, r) = (&left.subject, &right.subject);
    match key {
        SortKey::Subject => l.subject_id.cmp(&r.subject_id),
        SortKey::Revenue => compare_optional(l.revenue, r.revenue),
        SortKey::Growth => compare_optional(l.revenue_growth_pct, r.revenue_growth_pct),
        SortKey::Queries => l.query_count.cmp(&r.query_count),
        SortKey::Orders => l.my_orders_amount.total_cmp(&r.my_orders_amount),
        SortKey::Share => compare_optional(l.my_market_share_pct, r.my_market_share_pct),
        SortKey::Buyout => l.my_buyout_pct.total_cmp(&r.my_buyout_pct),
        SortKey::Recommendation => left.recommendation.cmp(&right.recommendation),
    }
}

/// Stable sort; ties keep their current order. Missing values sort lowest.
pub fn sort_rows(rows: &mut [AnalysisRow], key: SortKey, descending: bool) {
    rows.sort_by(|left, right| {
        let ordering = compare(left, right, key);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Cell, Table};
    use crate::schema::headers;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn raw() -> RawTables {
        RawTables {
            market: Table::from_rows(
                vec![headers::SUBJECT.into(), headers::REVENUE.into()],
                vec![
                    vec![text("Shoes"), text("1000")],
                    vec![text("Hats"), text("5000")],
                ],
            )
            .unwrap(),
            queries: Table::from_rows(
                vec![headers::SUBJECT.into(), headers::QUERY_COUNT.into()],
                vec![vec![text("Hats"), text("10")]],
            )
            .unwrap(),
            sales: Table::from_rows(
                vec![
                    headers::SUBJECT.into(),
                    headers::ORDER_AMOUNT.into(),
                    headers::LEGAL_ENTITY.into(),
                ],
                vec![vec![text("Shoes"), text("100"), text("A")]],
            )
            .unwrap(),
        }
    }

    #[test]
    fn unknown_entity_is_rejected() {
        let config = AnalysisConfig {
            legal_entity: EntitySelection::One("Z".into()),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            analyze(&raw(), &config),
            Err(PipelineError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn sorting_by_share_descending_puts_missing_last() {
        let analysis = analyze(&raw(), &AnalysisConfig::default()).unwrap();
        assert_eq!(analysis.entities, vec!["A"]);
        let mut rows = analysis.rows;
        rows[1].subject.my_market_share_pct = None;
        sort_rows(&mut rows, SortKey::Share, true);
        assert_eq!(rows[0].subject.subject_id, "Shoes");
        assert_eq!(rows[1].subject.subject_id, "Hats");

        sort_rows(&mut rows, SortKey::Subject, false);
        assert_eq!(rows[0].subject.subject_id, "Hats");
    }

    #[test]
    fn select_rows_filters_by_recommendation() {
        let analysis = analyze(&raw(), &AnalysisConfig::default()).unwrap();
        let config = AnalysisConfig {
            recommendations: vec![Recommendation::Wait],
            ..AnalysisConfig::default()
        };
        let kept = select_rows(&analysis.rows, &config);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].subject.subject_id, "Hats");
    }
}
