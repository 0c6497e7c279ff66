pub mod analyze;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod frame;
pub mod io_utils;
pub mod join;
pub mod loader;
pub mod pipeline;
pub mod queries;
pub mod recommend;
pub mod report;
pub mod sales;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    config::AnalysisConfig,
    schema::SourceSchema,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("niche_analyzer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => analyze::execute(&args),
        Commands::Queries(args) => queries::execute(&args),
        Commands::Entities(args) => handle_entities(&args),
        Commands::InitConfig(args) => handle_init_config(&args),
    }
}

fn handle_entities(args: &cli::EntitiesArgs) -> Result<()> {
    let options = loader::ReadOptions::from_labels(args.delimiter, args.input_encoding.as_deref())?;
    let raw = loader::load_sales(&args.sales, &options)?;
    let lines = sales::sales_lines(&SourceSchema::sales().prepare(&raw));
    let counts = lines.iter().counts_by(|line| line.legal_entity_id.clone());
    let rows = sales::observed_entities(&lines)
        .into_iter()
        .map(|entity| {
            let count = counts.get(&entity).copied().unwrap_or_default();
            vec![entity, count.to_string()]
        })
        .collect::<Vec<_>>();
    info!("Found {} legal entit(ies) in {} sales line(s)", rows.len(), lines.len());
    table::print_table(
        &[schema::headers::LEGAL_ENTITY.to_string(), "Строк продаж".to_string()],
        &rows,
    );
    Ok(())
}

fn handle_init_config(args: &cli::InitConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Config file {:?} already exists; pass --force to overwrite it",
            args.output
        );
    }
    AnalysisConfig::default()
        .save(&args.output)
        .with_context(|| format!("Writing default config to {:?}", args.output))?;
    info!("Default configuration written to {:?}", args.output);
    Ok(())
}
