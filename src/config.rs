//! Configuration schema for testtrace.
//!
//! The configuration names the attribute types that mark a method as a
//! test, plus run options.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::{MarkerSet, Propagation};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Canonical qualified names of test marker types
    /// (e.g. `NUnit.Framework.TestAttribute`).
    #[serde(default)]
    pub markers: Vec<String>,
    /// "transitive" (default) or "one_hop"
    #[serde(default)]
    pub propagation: Option<Propagation>,
    /// Minimum share of tested methods, in percent (exit non-zero below it)
    #[serde(default)]
    pub min_tested_percent: Option<f64>,
    /// Per-project analysis timeout in seconds
    #[serde(default)]
    pub project_timeout_secs: Option<u64>,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Returns the marker set.
    pub fn marker_set(&self) -> MarkerSet {
        MarkerSet::new(&self.markers)
    }

    /// Returns the propagation mode (defaults to transitive).
    pub fn get_propagation(&self) -> Propagation {
        self.propagation.unwrap_or_default()
    }

    /// Returns the per-project timeout, if any.
    pub fn project_timeout(&self) -> Option<Duration> {
        self.project_timeout_secs.map(Duration::from_secs)
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if config.markers.iter().all(|m| m.trim().is_empty()) {
        anyhow::bail!("no marker types configured");
    }

    for marker in &config.markers {
        let name = marker.trim();
        if name.is_empty() {
            anyhow::bail!("empty marker name");
        }
        if name.chars().any(|c| c.is_whitespace() || c == ',') {
            anyhow::bail!(
                "invalid marker {:?}: must be a single qualified type name",
                marker
            );
        }
        if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
            anyhow::bail!("invalid marker {:?}: malformed namespace", marker);
        }
    }

    if let Some(percent) = config.min_tested_percent {
        if !(0.0..=100.0).contains(&percent) {
            anyhow::bail!(
                "invalid min_tested_percent {}, must be between 0 and 100",
                percent
            );
        }
    }

    if config.project_timeout_secs == Some(0) {
        anyhow::bail!("project_timeout_secs must be positive");
    }

    Ok(())
}
