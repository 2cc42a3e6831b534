//! Pipeline configuration
//!
//! Defaults, overridden by environment variables (a `.env` file is loaded by
//! the binaries):
//!
//! - `LTW_DB_PATH`: SQLite database
//! - `LTW_OUTPUT_DIR`: where `result.csv` and `chart.svg` go
//! - `LTW_MODEL`: Claude model
//! - `ANTHROPIC_API_KEY`: required by the Claude agent only
//! - `LTW_MAX_ITERATIONS`: tool-loop bound
//! - `LTW_TOP_K`: row limit suggested to the model
//! - `LTW_INCLUDE_TABLES`: comma-separated tables the agent may see

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::agent::claude::{DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL, DEFAULT_TOP_K};
use crate::store::DEFAULT_TABLES;

pub const DEFAULT_DB_PATH: &str = "data/lt_walmart_data.db";
pub const DEFAULT_OUTPUT_DIR: &str = "./outputs";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub output_dir: PathBuf,
    pub model: String,
    pub api_key: Option<String>,
    pub max_iterations: usize,
    pub top_k: usize,
    pub include_tables: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            top_k: DEFAULT_TOP_K,
            include_tables: DEFAULT_TABLES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns; blank values are ignored
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("LTW_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = get("LTW_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(model) = get("LTW_MODEL") {
            config.model = model;
        }
        config.api_key = get("ANTHROPIC_API_KEY");
        if let Some(value) = get("LTW_MAX_ITERATIONS") {
            config.max_iterations = parse_count("LTW_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = get("LTW_TOP_K") {
            config.top_k = parse_count("LTW_TOP_K", &value)?;
        }
        if let Some(tables) = get("LTW_INCLUDE_TABLES") {
            config.include_tables = split_list(&tables);
        }

        Ok(config)
    }

    /// API key or a readable error
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) => Ok(key),
            None => bail!(
                "ANTHROPIC_API_KEY environment variable not set. \
                 Set it in the environment or in a .env file."
            ),
        }
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize> {
    let count: usize = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a positive integer, got '{}'", key, value))?;
    if count == 0 {
        bail!("{} must be greater than zero", key);
    }
    Ok(count)
}

pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
