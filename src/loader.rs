//! Loading of the three source sheets.
//!
//! Market and query sheets are required. Sales come from one file per legal
//! entity; the entity is the file name up to its first underscore
//! (`ЦР_Продажи.csv` → `ЦР`). Absent sales files are skipped with a warning
//! but at least one must exist.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};

use crate::{
    error::PipelineError,
    frame::{Cell, Table},
    io_utils,
    schema::headers,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    Market,
    Queries,
    Sales,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceRole::Market => "market",
            SourceRole::Queries => "queries",
            SourceRole::Sales => "sales",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Forced delimiter; `None` picks one from each file's extension.
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl ReadOptions {
    pub fn from_labels(delimiter: Option<u8>, encoding: Option<&str>) -> Result<Self> {
        Ok(Self {
            delimiter,
            encoding: io_utils::resolve_encoding(encoding)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub market: PathBuf,
    pub queries: PathBuf,
    pub sales: Vec<PathBuf>,
}

/// The raw, unreconciled source tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTables {
    pub market: Table,
    pub queries: Table,
    /// All sales files concatenated, tagged with their legal entity.
    pub sales: Table,
}

/// Legal entity encoded in a sales file name.
pub fn legal_entity_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split_once('_') {
        Some((prefix, _)) => prefix.to_string(),
        None => stem,
    }
}

fn read(path: &Path, options: &ReadOptions) -> Result<Table> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    io_utils::read_table(path, delimiter, options.encoding)
}

fn load_required(role: SourceRole, path: &Path, options: &ReadOptions) -> Result<Table> {
    if !path.exists() {
        return Err(PipelineError::MissingSource {
            role,
            path: path.to_path_buf(),
        }
        .into());
    }
    let table = read(path, options).with_context(|| format!("Loading {role} source {path:?}"))?;
    info!("Loaded {} {role} row(s) from {:?}", table.row_count(), path);
    Ok(table)
}

pub fn load_market(path: &Path, options: &ReadOptions) -> Result<Table> {
    load_required(SourceRole::Market, path, options)
}

pub fn load_queries(path: &Path, options: &ReadOptions) -> Result<Table> {
    load_required(SourceRole::Queries, path, options)
}

/// Loads and concatenates the sales files that exist.
pub fn load_sales(paths: &[PathBuf], options: &ReadOptions) -> Result<Table> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            warn!("Sales file {:?} not found; skipping", path);
            continue;
        }
        let entity = legal_entity_from_path(path);
        let table = read(path, options)
            .with_context(|| format!("Loading sales source {path:?}"))?
            .with_constant_column(headers::LEGAL_ENTITY, Cell::Text(entity.clone()));
        info!(
            "Loaded {} sales row(s) for entity '{}' from {:?}",
            table.row_count(),
            entity,
            path
        );
        tables.push(table);
    }
    if tables.is_empty() {
        return Err(PipelineError::NoSalesSources {
            checked: paths.len(),
        }
        .into());
    }
    Ok(Table::concat(&tables))
}

pub fn load_sources(paths: &SourcePaths, options: &ReadOptions) -> Result<RawTables> {
    Ok(RawTables {
        market: load_market(&paths.market, options)?,
        queries: load_queries(&paths.queries, options)?,
        sales: load_sales(&paths.sales, options)?,
    })
}
