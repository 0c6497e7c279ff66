use std::{thread, time::Duration};

use anyhow::{Context, Result};
use log::{error, info};

use crate::{
    cache::SourceCache,
    cli::AnalyzeArgs,
    config::AnalysisConfig,
    io_utils,
    loader::{self, RawTables, ReadOptions, SourcePaths},
    pipeline::{self, Analysis},
    report,
    sales::EntitySelection,
    table,
};

/// Configuration file (or defaults) with the command-line flags applied on
/// top.
pub fn resolve_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    config.thresholds.apply_overrides(&args.thresholds);
    config
        .thresholds
        .validate()
        .context("Validating threshold overrides")?;
    if let Some(entity) = &args.entity {
        config.legal_entity = EntitySelection::from(entity.clone());
    }
    if !args.recommendations.is_empty() {
        config.recommendations = args.recommendations.clone();
    }
    Ok(config)
}

pub fn execute(args: &AnalyzeArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let options = ReadOptions::from_labels(args.delimiter, args.input_encoding.as_deref())?;
    let paths = SourcePaths {
        market: args.market.clone(),
        queries: args.queries.clone(),
        sales: args.sales.clone(),
    };
    info!(
        "Analyzing {} sales source(s) for entity '{}' with thresholds {:?}",
        paths.sales.len(),
        config.legal_entity,
        config.thresholds
    );

    let mut cache = SourceCache::new(config.cache_ttl());
    run_once(&mut cache, &paths, &options, &config, args)?;

    let Some(interval) = args.watch else {
        return Ok(());
    };
    let interval = Duration::from_secs(interval.max(1));
    info!(
        "Watching sources every {}s (cache TTL {}s); press Ctrl+C to stop",
        interval.as_secs(),
        cache.ttl().as_secs()
    );
    loop {
        thread::sleep(interval);
        if let Err(err) = run_once(&mut cache, &paths, &options, &config, args) {
            error!("Refresh failed: {err:#}");
        }
    }
}

fn run_once(
    cache: &mut SourceCache<RawTables>,
    paths: &SourcePaths,
    options: &ReadOptions,
    config: &AnalysisConfig,
    args: &AnalyzeArgs,
) -> Result<()> {
    let raw = cache.get_or_load(|| loader::load_sources(paths, options))?;
    let Analysis { rows, entities } = pipeline::analyze(raw, config)?;
    if let Some(loaded_at) = cache.loaded_at() {
        info!(
            "Sources loaded at {}; entities: {}",
            loaded_at.format("%Y-%m-%d %H:%M:%S"),
            entities.join(", ")
        );
    }

    let mut selected = pipeline::select_rows(&rows, config);
    if let Some(key) = args.sort {
        pipeline::sort_rows(&mut selected, key, args.descending);
    }
    if let Some(limit) = args.limit {
        selected.truncate(limit);
    }

    if let Some(path) = args.output.as_deref() {
        let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
        report::export(path, &selected, None, encoding)
            .with_context(|| format!("Exporting analysis to {path:?}"))?;
        info!("Wrote {} subject(s) to {:?}", selected.len(), path);
    } else if selected.is_empty() {
        info!("No subjects match the selected recommendations");
    } else {
        let (headers, formatted, aligns) = report::subject_table(&selected);
        table::print_aligned(&headers, &formatted, &aligns);
    }
    Ok(())
}
