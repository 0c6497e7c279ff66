//! Market join and derived metrics.
//!
//! The market sheet drives the output: every subject it lists yields exactly
//! one [`SubjectRecord`], whether or not it has query or sales data. Query
//! and sales aggregates are looked up by subject and defaulted to zero.

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::Serialize;

use crate::{
    data::{ZeroDenominator, round_to, safe_ratio},
    frame::Table,
    queries::{SubjectQueries, to_count},
    sales::SalesSelection,
    schema::headers,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRecord {
    pub subject_id: String,
    pub seller_count: Option<u64>,
    pub seller_count_with_orders: Option<u64>,
    pub monopolization_pct: Option<f64>,
    pub revenue: Option<f64>,
    pub revenue_growth_pct: Option<f64>,
    pub avg_ticket: Option<f64>,
    pub turnover_days: Option<f64>,
    pub market_buyout_pct: Option<f64>,
}

impl MarketRecord {
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            seller_count: None,
            seller_count_with_orders: None,
            monopolization_pct: None,
            revenue: None,
            revenue_growth_pct: None,
            avg_ticket: None,
            turnover_days: None,
            market_buyout_pct: None,
        }
    }
}

/// Reads market rows from a table prepared with [`crate::schema::SourceSchema::market`].
///
/// Rows without a subject are skipped. A repeated subject keeps its first row.
pub fn market_records(table: &Table) -> Vec<MarketRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let Some(subject) = table.get(row, headers::SUBJECT).as_key() else {
            warn!("market: row {} has no subject; skipped", row + 2);
            continue;
        };
        if !seen.insert(subject.clone()) {
            warn!("market: subject '{subject}' repeated on row {}; keeping the first", row + 2);
            continue;
        }
        let number = |column: &str| table.get(row, column).as_number();
        records.push(MarketRecord {
            seller_count: number(headers::SELLERS).map(to_count),
            seller_count_with_orders: number(headers::SELLERS_WITH_ORDERS).map(to_count),
            monopolization_pct: number(headers::MONOPOLIZATION),
            revenue: number(headers::REVENUE),
            revenue_growth_pct: number(headers::REVENUE_GROWTH),
            avg_ticket: number(headers::AVG_TICKET),
            turnover_days: number(headers::TURNOVER_DAYS),
            market_buyout_pct: number(headers::BUYOUT_PCT),
            ..MarketRecord::new(&subject)
        });
    }
    records
}

/// One row of the final joined table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRecord {
    pub subject_id: String,
    pub seller_count: Option<u64>,
    pub seller_count_with_orders: Option<u64>,
    pub monopolization_pct: Option<f64>,
    pub revenue: Option<f64>,
    pub revenue_growth_pct: Option<f64>,
    pub avg_ticket: Option<f64>,
    pub turnover_days: Option<f64>,
    pub market_buyout_pct: Option<f64>,
    pub query_count: u64,
    pub my_orders_amount: f64,
    pub my_buyout_amount: f64,
    pub my_item_count: u64,
    pub my_buyout_pct: f64,
    pub legal_entities: String,
    /// Missing only when the market sheet has no revenue for the subject.
    pub my_market_share_pct: Option<f64>,
}

/// `orders / revenue * 100` rounded to 2 decimals; zero revenue divides by 1.
pub fn market_share_pct(my_orders_amount: f64, revenue: f64) -> f64 {
    round_to(
        safe_ratio(my_orders_amount, revenue, ZeroDenominator::DivideByOne) * 100.0,
        2,
    )
}

/// Left-joins the market rows onto the query and sales aggregates.
pub fn join(
    market: &[MarketRecord],
    queries: &[SubjectQueries],
    sales: &SalesSelection,
) -> Vec<SubjectRecord> {
    let query_counts: HashMap<&str, u64> = queries
        .iter()
        .map(|record| (record.subject_id.as_str(), record.query_count))
        .collect();

    market
        .iter()
        .map(|record| {
            let mine = sales.get_or_default(&record.subject_id);
            SubjectRecord {
                subject_id: record.subject_id.clone(),
                seller_count: record.seller_count,
                seller_count_with_orders: record.seller_count_with_orders,
                monopolization_pct: record.monopolization_pct,
                revenue: record.revenue,
                revenue_growth_pct: record.revenue_growth_pct,
                avg_ticket: record.avg_ticket,
                turnover_days: record.turnover_days,
                market_buyout_pct: record.market_buyout_pct,
                query_count: query_counts
                    .get(record.subject_id.as_str())
                    .copied()
                    .unwrap_or(0),
                my_orders_amount: mine.my_orders_amount,
                my_buyout_amount: mine.my_buyout_amount,
                my_item_count: mine.my_item_count,
                my_buyout_pct: mine.my_buyout_pct,
                my_market_share_pct: record
                    .revenue
                    .map(|revenue| market_share_pct(mine.my_orders_amount, revenue)),
                legal_entities: mine.legal_entities,
            }
        })
        .collect()
}
