//! Sales aggregation per subject and legal entity.
//!
//! Sales exports are SKU-level. They are grouped twice: once per
//! (subject, legal entity) pair and once per subject across all entities.
//! [`EntitySelection`] picks which of the two the join consumes.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    convert::Infallible,
    fmt,
    str::FromStr,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    data::{ZeroDenominator, mean_or_zero, round_to, safe_ratio},
    frame::Table,
    schema::headers,
};

/// Marker for "no sales presence" in the entity list.
pub const NO_ENTITIES: &str = "—";

#[derive(Debug, Clone, PartialEq)]
pub struct SalesLine {
    pub subject_id: String,
    pub legal_entity_id: String,
    pub order_amount: Option<f64>,
    pub buyout_amount: Option<f64>,
    pub buyout_pct: Option<f64>,
    pub item_key: Option<String>,
}

/// Reads sales lines from a table prepared with [`crate::schema::SourceSchema::sales`].
/// Lines without a subject or an entity cannot be grouped and are dropped.
pub fn sales_lines(table: &Table) -> Vec<SalesLine> {
    (0..table.row_count())
        .filter_map(|row| {
            Some(SalesLine {
                subject_id: table.get(row, headers::SUBJECT).as_key()?,
                legal_entity_id: table.get(row, headers::LEGAL_ENTITY).as_key()?,
                order_amount: table.get(row, headers::ORDER_AMOUNT).as_number(),
                buyout_amount: table.get(row, headers::BUYOUT_AMOUNT).as_number(),
                buyout_pct: table.get(row, headers::BUYOUT_PCT).as_number(),
                item_key: table.get(row, headers::ITEM_KEY).as_key(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySales {
    pub subject_id: String,
    pub legal_entity_id: String,
    pub my_orders_amount: f64,
    pub my_buyout_amount: f64,
    pub my_item_count: u64,
    pub my_buyout_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSales {
    pub subject_id: String,
    pub my_orders_amount: f64,
    pub my_buyout_amount: f64,
    pub my_item_count: u64,
    pub my_buyout_pct: f64,
    pub legal_entities: String,
}

impl SubjectSales {
    fn empty(subject_id: &str, legal_entities: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            my_orders_amount: 0.0,
            my_buyout_amount: 0.0,
            my_item_count: 0,
            my_buyout_pct: 0.0,
            legal_entities: legal_entities.to_string(),
        }
    }
}

/// Groups lines by (subject, legal entity), ordered by both keys.
///
/// The buyout percentage is the ratio of summed buyout to summed orders when
/// the group carries any buyout amount, and the mean of the per-line
/// percentages otherwise. Zero orders give 0.
pub fn aggregate_sales(lines: &[SalesLine]) -> Vec<EntitySales> {
    let mut groups: BTreeMap<(&str, &str), Vec<&SalesLine>> = BTreeMap::new();
    for line in lines {
        groups
            .entry((line.subject_id.as_str(), line.legal_entity_id.as_str()))
            .or_default()
            .push(line);
    }

    groups
        .into_iter()
        .map(|((subject, entity), group)| {
            let orders: f64 = group.iter().filter_map(|l| l.order_amount).sum();
            let buyout: f64 = group.iter().filter_map(|l| l.buyout_amount).sum();
            let has_buyout_amounts = group.iter().any(|l| l.buyout_amount.is_some());
            let buyout_pct = if has_buyout_amounts {
                safe_ratio(buyout, orders, ZeroDenominator::Zero) * 100.0
            } else {
                mean_or_zero(group.iter().filter_map(|l| l.buyout_pct))
            };
            EntitySales {
                subject_id: subject.to_string(),
                legal_entity_id: entity.to_string(),
                my_orders_amount: round_to(orders, 2),
                my_buyout_amount: round_to(buyout, 2),
                my_item_count: group.len() as u64,
                my_buyout_pct: round_to(buyout_pct, 2),
            }
        })
        .collect()
}

/// Rolls per-entity records up to one record per subject.
///
/// The buyout percentage is the mean of the per-entity percentages, not a
/// ratio of the summed amounts.
pub fn rollup(entity_sales: &[EntitySales]) -> Vec<SubjectSales> {
    entity_sales
        .iter()
        .into_group_map_by(|record| record.subject_id.as_str())
        .into_iter()
        .sorted_by(|(left, _), (right, _)| left.cmp(right))
        .map(|(subject, group)| SubjectSales {
            subject_id: subject.to_string(),
            my_orders_amount: round_to(group.iter().map(|r| r.my_orders_amount).sum(), 2),
            my_buyout_amount: round_to(group.iter().map(|r| r.my_buyout_amount).sum(), 2),
            my_item_count: group.iter().map(|r| r.my_item_count).sum(),
            my_buyout_pct: round_to(mean_or_zero(group.iter().map(|r| r.my_buyout_pct)), 2),
            legal_entities: group
                .iter()
                .map(|r| r.legal_entity_id.as_str())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .join(", "),
        })
        .collect()
}

/// Sorted distinct legal entities that appear in the sales lines.
pub fn observed_entities(lines: &[SalesLine]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.legal_entity_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntitySelection {
    /// All legal entities combined.
    #[default]
    All,
    One(String),
}

impl FromStr for EntitySelection {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "" | "all" | "*" | "любое" => EntitySelection::All,
            _ => EntitySelection::One(trimmed.to_string()),
        })
    }
}

impl From<String> for EntitySelection {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(selection) => selection,
            Err(never) => match never {},
        }
    }
}

impl From<EntitySelection> for String {
    fn from(selection: EntitySelection) -> Self {
        selection.to_string()
    }
}

impl fmt::Display for EntitySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntitySelection::All => write!(f, "all"),
            EntitySelection::One(entity) => write!(f, "{entity}"),
        }
    }
}

/// Per-subject sales view for one [`EntitySelection`].
#[derive(Debug, Clone)]
pub struct SalesSelection {
    by_subject: HashMap<String, SubjectSales>,
    unmatched_entities: String,
}

impl SalesSelection {
    pub fn new(entity_sales: &[EntitySales], selection: &EntitySelection) -> Self {
        match selection {
            EntitySelection::All => Self {
                by_subject: rollup(entity_sales)
                    .into_iter()
                    .map(|record| (record.subject_id.clone(), record))
                    .collect(),
                unmatched_entities: NO_ENTITIES.to_string(),
            },
            EntitySelection::One(entity) => Self {
                by_subject: entity_sales
                    .iter()
                    .filter(|record| &record.legal_entity_id == entity)
                    .map(|record| {
                        (
                            record.subject_id.clone(),
                            SubjectSales {
                                subject_id: record.subject_id.clone(),
                                my_orders_amount: record.my_orders_amount,
                                my_buyout_amount: record.my_buyout_amount,
                                my_item_count: record.my_item_count,
                                my_buyout_pct: record.my_buyout_pct,
                                legal_entities: entity.clone(),
                            },
                        )
                    })
                    .collect(),
                unmatched_entities: entity.clone(),
            },
        }
    }

    pub fn get(&self, subject_id: &str) -> Option<&SubjectSales> {
        self.by_subject.get(subject_id)
    }

    /// The record for `subject_id`, or an all-zero one when it has no sales.
    pub fn get_or_default(&self, subject_id: &str) -> SubjectSales {
        self.get(subject_id)
            .cloned()
            .unwrap_or_else(|| SubjectSales::empty(subject_id, &self.unmatched_entities))
    }

    pub fn len(&self) -> usize {
        self.by_subject.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_subject.is_empty()
    }
}
