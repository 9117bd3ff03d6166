//! Analysis configuration (`costscope.toml`)
//!
//! # Example costscope.toml
//!
//! ```toml
//! project_root = "/home/me/sim"
//! source_extensions = ["f90", "f", "F90"]
//! top = 20
//! min_ratio = 0.01
//!
//! [event_counter]
//! start = "fapp_start"
//! stop = "fapp_stop"
//! ```
//!
//! Every key is optional; command-line flags override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_extensions() -> Vec<String> {
    ["f", "f77", "f90", "f95", "f03", "f08", "c", "cpp", "h"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_start_routine() -> String {
    "fapp_start".to_string()
}

fn default_stop_routine() -> String {
    "fapp_stop".to_string()
}

/// Routines bracketing an event-counter measurement region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCounterRoutines {
    #[serde(default = "default_start_routine")]
    pub start: String,
    #[serde(default = "default_stop_routine")]
    pub stop: String,
}

impl Default for EventCounterRoutines {
    fn default() -> Self {
        Self {
            start: default_start_routine(),
            stop: default_stop_routine(),
        }
    }
}

/// Settings for one analysis run
///
/// # Example
/// ```
/// use costscope::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.event_counter.start, "fapp_start");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory scanned for files to reconcile recorded paths against
    pub project_root: Option<PathBuf>,

    /// Extensions (without dot, case-insensitive) of project source files
    ///
    /// An empty list accepts every file.
    pub source_extensions: Vec<String>,

    /// Rows shown per category; `None` shows all
    pub top: Option<usize>,

    /// Rows below this share of their category are hidden
    pub min_ratio: f64,

    pub event_counter: EventCounterRoutines,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            source_extensions: default_extensions(),
            top: None,
            min_ratio: 0.0,
            event_counter: EventCounterRoutines::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_ratio) {
            return Err(format!("min_ratio must be in [0, 1], got {}", self.min_ratio));
        }

        if self.top == Some(0) {
            return Err("top must be at least 1".to_string());
        }

        if let Some(ext) = self
            .source_extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(format!(
                "source_extensions entries must be non-empty and have no leading dot, got {ext:?}"
            ));
        }

        if self.event_counter.start.trim().is_empty() || self.event_counter.stop.trim().is_empty()
        {
            return Err("event_counter start and stop routines must be named".to_string());
        }

        Ok(())
    }
}
