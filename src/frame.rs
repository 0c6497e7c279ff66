//! In-memory raw tables.
//!
//! Every source sheet is loaded into a [`Table`]: an ordered header list and
//! rows of [`Cell`]s. Rows always have exactly one cell per header; short rows
//! are padded with [`Cell::Missing`] when they are pushed. Transformations in
//! the pipeline never mutate a loaded table in place, they build a new one.

use std::fmt;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// No value at all. Distinct from an empty string and from zero.
    Missing,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Wraps a raw field read from a source file. Blank fields are missing.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text form used for grouping keys. Numbers are rendered without a
    /// trailing `.0` so that `12` and `12.0` land in the same group.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Cell::Number(value) => Some(render_number(*value)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(text) => write!(f, "{text}"),
            Cell::Number(value) => write!(f, "{}", render_number(*value)),
        }
    }
}

fn render_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Assembles a table from rows already shaped to `headers`.
    pub(crate) fn from_shaped_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == headers.len()));
        Table { headers, rows }
    }

    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut table = Table::new(headers);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) -> Result<()> {
        ensure!(
            row.len() <= self.headers.len(),
            "Row has {} field(s) but the table only has {} column(s)",
            row.len(),
            self.headers.len()
        );
        row.resize(self.headers.len(), Cell::Missing);
        self.rows.push(row);
        Ok(())
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&Cell::Missing)
    }

    /// Cell lookup by header name; an absent column reads as missing.
    pub fn get(&self, row: usize, column: &str) -> &Cell {
        match self.column_index(column) {
            Some(idx) => self.cell(row, idx),
            None => &Cell::Missing,
        }
    }

    /// Returns a copy with `name` set to `value` on every row, appending the
    /// column when the table does not have it yet.
    pub fn with_constant_column(&self, name: &str, value: Cell) -> Table {
        let mut headers = self.headers.clone();
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                headers.push(name.to_string());
                headers.len() - 1
            }
        };
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.resize(headers.len(), Cell::Missing);
                row[idx] = value.clone();
                row
            })
            .collect();
        Table { headers, rows }
    }

    pub fn map_column<F>(&self, column: usize, mut f: F) -> Table
    where
        F: FnMut(&Cell) -> Cell,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(cell) = row.get_mut(column) {
                    *cell = f(cell);
                }
                row
            })
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Row-wise concatenation. Headers are unioned in first-seen order and
    /// cells a table does not carry are missing.
    pub fn concat(tables: &[Table]) -> Table {
        let mut headers: Vec<String> = Vec::new();
        for table in tables {
            for header in &table.headers {
                if !headers.contains(header) {
                    headers.push(header.clone());
                }
            }
        }
        let mut rows = Vec::with_capacity(tables.iter().map(Table::row_count).sum());
        for table in tables {
            let positions = headers
                .iter()
                .map(|header| table.column_index(header))
                .collect::<Vec<_>>();
            for row in &table.rows {
                rows.push(
                    positions
                        .iter()
                        .map(|pos| match pos {
                            Some(idx) => row.get(*idx).cloned().unwrap_or(Cell::Missing),
                            None => Cell::Missing,
                        })
                        .collect(),
                );
            }
        }
        Table { headers, rows }
    }
}
