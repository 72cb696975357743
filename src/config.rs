// YAML configuration for the command-line shell

use crate::filter::SortOption;
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

const APP_DIR: &str = "taskforest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSONL snapshot holding the task forest
    pub data_file: PathBuf,
    /// Sort applied by `list` when none is given
    pub default_sort: SortOption,
    /// trace, debug, info, warn or error
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            default_sort: SortOption::default(),
            log_level: "warn".to_string(),
        }
    }
}

fn default_data_file() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".taskforest"))
        .join("tasks.jsonl")
}

impl Config {
    /// `<config dir>/taskforest/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults; an unreadable or invalid one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))?;
        config.log_level()?;
        Ok(config)
    }

    pub fn log_level(&self) -> Result<Level> {
        self.log_level
            .parse()
            .map_err(|_| eyre!("Invalid log_level: {} (expected trace/debug/info/warn/error)", self.log_level))
    }
}
