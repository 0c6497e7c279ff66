//! Source schemas and the column reconciler.
//!
//! Each source sheet is described once, declaratively, by a [`SourceSchema`]:
//! the columns the pipeline reads, the header variants seen across export
//! versions, the numeric flag and an optional default. [`SourceSchema::reconcile`]
//! turns whatever a loaded file contains into a table with exactly those
//! columns, so no consumer downstream ever checks for column presence.
//!
//! Header matching is case-insensitive and collapses runs of whitespace.

use std::{collections::BTreeMap, sync::OnceLock};

use log::{debug, warn};
use regex::Regex;

use crate::{
    data::coerce_numeric,
    frame::{Cell, Table},
};

/// Canonical header names, as written by the marketplace exports.
pub mod headers {
    pub const SUBJECT: &str = "Предмет";

    pub const SELLERS: &str = "Продавцы";
    pub const SELLERS_WITH_ORDERS: &str = "Продавцы с заказами";
    pub const MONOPOLIZATION: &str = "Монополизация, %";
    pub const REVENUE: &str = "Выручка, ₽";
    pub const REVENUE_GROWTH: &str = "%  прироста выручки";
    pub const AVG_TICKET: &str = "Средний чек, ₽";
    pub const TURNOVER_DAYS: &str = "Оборачиваемость за неделю, дни";
    pub const BUYOUT_PCT: &str = "Процент выкупа";

    pub const SEARCH_PHRASE: &str = "Поисковый запрос";
    pub const QUERY_COUNT: &str = "Количество запросов";
    pub const QUERY_COUNT_PREV: &str = "Количество запросов (предыдущий период)";
    pub const ORDER_COUNT: &str = "Заказали товаров";
    pub const ORDER_COUNT_PREV: &str = "Заказали товаров (предыдущий период)";
    pub const CART_CONVERSION: &str = "Конверсия в корзину, %";
    pub const ORDER_CONVERSION: &str = "Конверсия в заказ, %";

    pub const ITEM_KEY: &str = "Артикул WB";
    pub const ORDER_AMOUNT: &str = "Заказали на сумму, ₽";
    pub const BUYOUT_AMOUNT: &str = "Выкупили на сумму, ₽";
    /// Added by the loader from the sales file name, never read from content.
    pub const LEGAL_ENTITY: &str = "Юрлицо";
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedColumn {
    pub name: String,
    pub aliases: Vec<String>,
    pub numeric: bool,
    pub default: Option<Cell>,
}

impl ExpectedColumn {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            numeric: false,
            default: None,
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self {
            numeric: true,
            ..Self::text(name)
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn default_to(mut self, value: Cell) -> Self {
        self.default = Some(value);
        self
    }

    pub fn matches_header(&self, header: &str) -> bool {
        let wanted = normalize_header(header);
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .any(|candidate| normalize_header(candidate) == wanted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSchema {
    /// Short label used in log messages.
    pub source: String,
    pub columns: Vec<ExpectedColumn>,
}

impl SourceSchema {
    pub fn new(source: &str, columns: Vec<ExpectedColumn>) -> Self {
        Self {
            source: source.to_string(),
            columns,
        }
    }

    pub fn market() -> Self {
        use headers::*;
        Self::new(
            "market",
            vec![
                ExpectedColumn::text(SUBJECT),
                ExpectedColumn::numeric(SELLERS),
                ExpectedColumn::numeric(SELLERS_WITH_ORDERS),
                ExpectedColumn::numeric(MONOPOLIZATION).alias("Монополизация"),
                ExpectedColumn::numeric(REVENUE).alias("Выручка"),
                ExpectedColumn::numeric(REVENUE_GROWTH).alias("Прирост выручки, %"),
                ExpectedColumn::numeric(AVG_TICKET).alias("Средний чек"),
                ExpectedColumn::numeric(TURNOVER_DAYS).alias("Оборачиваемость, дни"),
                ExpectedColumn::numeric(BUYOUT_PCT).alias("Процент выкупа, %"),
            ],
        )
    }

    pub fn queries() -> Self {
        use headers::*;
        Self::new(
            "queries",
            vec![
                ExpectedColumn::text(SUBJECT),
                ExpectedColumn::text(SEARCH_PHRASE).alias("Запрос"),
                ExpectedColumn::numeric(QUERY_COUNT)
                    .alias("Частота запросов")
                    .default_to(Cell::Number(0.0)),
                ExpectedColumn::numeric(QUERY_COUNT_PREV)
                    .alias("Количество запросов (прошлый период)"),
                ExpectedColumn::numeric(ORDER_COUNT),
                ExpectedColumn::numeric(ORDER_COUNT_PREV)
                    .alias("Заказали товаров (прошлый период)"),
                ExpectedColumn::numeric(CART_CONVERSION),
                ExpectedColumn::numeric(ORDER_CONVERSION),
            ],
        )
    }

    pub fn sales() -> Self {
        use headers::*;
        Self::new(
            "sales",
            vec![
                ExpectedColumn::text(SUBJECT),
                ExpectedColumn::text(LEGAL_ENTITY),
                ExpectedColumn::text(ITEM_KEY).alias("Артикул"),
                ExpectedColumn::numeric(ORDER_AMOUNT)
                    .alias("Заказали на сумму")
                    .default_to(Cell::Number(0.0)),
                ExpectedColumn::numeric(BUYOUT_AMOUNT).alias("Выкупили на сумму"),
                ExpectedColumn::numeric(BUYOUT_PCT).alias("Выкуп, %"),
            ],
        )
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| column.numeric)
            .map(|column| column.name.clone())
            .collect()
    }

    /// Position of the input header that feeds each expected column.
    fn resolve(&self, headers: &[String]) -> Vec<Option<usize>> {
        self.columns
            .iter()
            .map(|column| {
                headers
                    .iter()
                    .position(|header| header == &column.name)
                    .or_else(|| headers.iter().position(|h| column.matches_header(h)))
            })
            .collect()
    }

    /// Produces a table with exactly this schema's columns, in order, and the
    /// same row count as `table`.
    ///
    /// Present columns are copied as-is. An absent column is filled with its
    /// default, or with [`Cell::Missing`] when it has none. Never fails.
    pub fn reconcile(&self, table: &Table) -> Table {
        let positions = self.resolve(table.headers());
        for (column, position) in self.columns.iter().zip(&positions) {
            match (position, &column.default) {
                (Some(idx), _) if table.headers()[*idx] != column.name => debug!(
                    "{}: reading column '{}' from header '{}'",
                    self.source,
                    column.name,
                    table.headers()[*idx]
                ),
                (Some(_), _) => {}
                (None, Some(default)) => debug!(
                    "{}: column '{}' not found; filling with default {:?}",
                    self.source, column.name, default
                ),
                (None, None) => warn!(
                    "{}: column '{}' not found; values treated as missing",
                    self.source, column.name
                ),
            }
        }

        let rows = table
            .rows()
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(&positions)
                    .map(|(column, position)| match position {
                        Some(idx) => row.get(*idx).cloned().unwrap_or(Cell::Missing),
                        None => column.default.clone().unwrap_or(Cell::Missing),
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        Table::from_shaped_rows(self.column_names(), rows)
    }

    /// Reconciles `table` and coerces the numeric columns.
    pub fn prepare(&self, table: &Table) -> Table {
        coerce_numeric(&self.reconcile(table), &self.numeric_columns())
    }
}

/// Reconciles `table` against a plain column list with per-column defaults.
pub fn reconcile(table: &Table, expected: &[&str], defaults: &BTreeMap<&str, Cell>) -> Table {
    let columns = expected
        .iter()
        .map(|name| {
            let column = ExpectedColumn::text(name);
            match defaults.get(name) {
                Some(default) => column.default_to(default.clone()),
                None => column,
            }
        })
        .collect();
    SourceSchema::new("table", columns).reconcile(table)
}

pub fn normalize_header(header: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let pattern = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    pattern
        .replace_all(header.trim().trim_start_matches('\u{feff}'), " ")
        .trim()
        .to_lowercase()
}
