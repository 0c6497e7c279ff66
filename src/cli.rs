use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{pipeline::SortKey, recommend::Recommendation};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Rank marketplace niches from market, search and sales exports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Join market, query and sales data and recommend an action per subject
    Analyze(AnalyzeArgs),
    /// Show the search queries recorded for one subject
    Queries(QueriesArgs),
    /// List the legal entities found in the sales files
    Entities(EntitiesArgs),
    /// Write the default analysis configuration as YAML
    InitConfig(InitConfigArgs),
}

/// Threshold overrides. Unset flags keep the configured value.
#[derive(Debug, Clone, Default, Args)]
pub struct ThresholdArgs {
    /// Minimum revenue growth, %, for entering or reinforcing a niche
    #[arg(long = "min-growth-pct")]
    pub min_growth_pct: Option<f64>,
    /// Maximum monopolization, %, for entering a niche
    #[arg(long = "max-monopolization-pct")]
    pub max_monopolization_pct: Option<f64>,
    /// Minimum number of search queries for entering a niche
    #[arg(long = "min-query-count")]
    pub min_query_count: Option<u64>,
    /// Maximum turnover in days for entering a niche
    #[arg(long = "max-turnover-days")]
    pub max_turnover_days: Option<f64>,
    /// Minimum own buyout, %, for reinforcing a niche
    #[arg(long = "min-buyout-pct")]
    pub min_buyout_pct: Option<f64>,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Market overview export (one row per subject)
    #[arg(short = 'm', long = "market")]
    pub market: PathBuf,
    /// Search query export
    #[arg(short = 'q', long = "queries")]
    pub queries: PathBuf,
    /// Sales export per legal entity, named `<ENTITY>_<anything>.csv` (repeatable)
    #[arg(short = 's', long = "sales", required = true, action = clap::ArgAction::Append)]
    pub sales: Vec<PathBuf>,
    /// YAML configuration file (see `init-config`)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub thresholds: ThresholdArgs,
    /// Legal entity to analyze, or `all`
    #[arg(short = 'e', long = "entity")]
    pub entity: Option<String>,
    /// Keep only subjects with these recommendations (repeatable)
    #[arg(short = 'r', long = "recommendation", value_enum, action = clap::ArgAction::Append)]
    pub recommendations: Vec<Recommendation>,
    /// Column to sort by; market order is kept when omitted
    #[arg(long = "sort", value_enum)]
    pub sort: Option<SortKey>,
    /// Sort in descending order
    #[arg(long, requires = "sort")]
    pub descending: bool,
    /// Show at most this many subjects
    #[arg(long)]
    pub limit: Option<usize>,
    /// Export to a file instead of printing (`.json` writes JSON, anything else CSV/TSV)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Re-run the analysis every SECS seconds until interrupted
    #[arg(long = "watch", value_name = "SECS")]
    pub watch: Option<u64>,
    /// CSV delimiter character for every input (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding of the exported file (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct QueriesArgs {
    /// Search query export
    #[arg(short = 'q', long = "queries")]
    pub queries: PathBuf,
    /// Subject whose queries are listed
    #[arg(long)]
    pub subject: String,
    /// Show at most this many queries
    #[arg(long)]
    pub limit: Option<usize>,
    /// Export to a CSV/TSV file instead of printing
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// CSV delimiter character of the input (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding of the exported file (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Sales export per legal entity (repeatable)
    #[arg(short = 's', long = "sales", required = true, action = clap::ArgAction::Append)]
    pub sales: Vec<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Destination YAML file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
