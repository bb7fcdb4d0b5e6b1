// Configuration - JSON file with defaults for every field
// Command-line flags are applied on top by the binaries.

use crate::source::DEFAULT_ENDPOINT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Data service the dashboard fetches from
    pub endpoint: String,

    /// Directory receiving the exported CSV
    pub export_dir: PathBuf,

    /// Log file used while the terminal UI owns the screen
    pub log_file: PathBuf,

    /// Server listen address
    pub bind: String,

    /// JSON record file served by the server
    pub data_file: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("mercuriales.log"),
            bind: "127.0.0.1:5000".to_string(),
            data_file: None,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: DashboardConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// File config when a path is given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
