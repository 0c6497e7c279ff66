//! Analysis configuration.
//!
//! Thresholds and selections are plain values passed into the pipeline. They
//! can be stored as YAML (`init-config` writes the defaults) and every field
//! can be overridden from the command line.

use std::{fs::File, io::Write, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{cli::ThresholdArgs, recommend::Recommendation, sales::EntitySelection};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub min_growth_pct: f64,
    pub max_monopolization_pct: f64,
    pub min_query_count: u64,
    pub max_turnover_days: f64,
    pub min_buyout_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_growth_pct: 20.0,
            max_monopolization_pct: 50.0,
            min_query_count: 100_000,
            max_turnover_days: 30.0,
            min_buyout_pct: 70.0,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_growth_pct", self.min_growth_pct),
            ("max_monopolization_pct", self.max_monopolization_pct),
            ("max_turnover_days", self.max_turnover_days),
            ("min_buyout_pct", self.min_buyout_pct),
        ] {
            ensure!(value.is_finite(), "Threshold '{name}' must be a finite number");
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ThresholdArgs) {
        if let Some(value) = overrides.min_growth_pct {
            self.min_growth_pct = value;
        }
        if let Some(value) = overrides.max_monopolization_pct {
            self.max_monopolization_pct = value;
        }
        if let Some(value) = overrides.min_query_count {
            self.min_query_count = value;
        }
        if let Some(value) = overrides.max_turnover_days {
            self.max_turnover_days = value;
        }
        if let Some(value) = overrides.min_buyout_pct {
            self.min_buyout_pct = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub thresholds: Thresholds,
    pub legal_entity: EntitySelection,
    /// Labels to keep in the output; empty keeps every label.
    pub recommendations: Vec<Recommendation>,
    pub cache_ttl_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            legal_entity: EntitySelection::All,
            recommendations: Vec::new(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: AnalysisConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config
            .thresholds
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = self.to_yaml_string()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(serialized.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing configuration")
    }

    pub fn accepts(&self, recommendation: Recommendation) -> bool {
        self.recommendations.is_empty() || self.recommendations.contains(&recommendation)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
