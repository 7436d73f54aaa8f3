//! `depline.toml` workspace configuration

use anyhow::Context;
use depline_core::{AggregationOptions, StoreFormat};
use depline_indexer::DEFAULT_EXTERNAL_PROJECT;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "depline.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store_format: StoreFormat,
    pub external_project: String,
    /// Glob patterns of source files to skip.
    pub exclude: Vec<String>,
    pub workers: Option<usize>,
    pub aggregate_start: bool,
    pub aggregate_end: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_format: StoreFormat::default(),
            external_project: DEFAULT_EXTERNAL_PROJECT.to_string(),
            exclude: Vec::new(),
            workers: None,
            aggregate_start: true,
            aggregate_end: true,
        }
    }
}

impl Config {
    /// Load `depline.toml` from the workspace root; defaults when absent.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn aggregation(&self) -> AggregationOptions {
        AggregationOptions {
            aggregate_start: self.aggregate_start,
            aggregate_end: self.aggregate_end,
        }
    }
}
