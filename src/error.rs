use std::path::PathBuf;

use thiserror::Error;

use crate::loader::SourceRole;

/// Conditions that stop a run before any table is produced.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{role} source {path:?} not found")]
    MissingSource { role: SourceRole, path: PathBuf },
    #[error("no sales files found ({checked} path(s) checked)")]
    NoSalesSources { checked: usize },
    #[error("unknown legal entity '{entity}' (available: {available})")]
    UnknownEntity { entity: String, available: String },
}
