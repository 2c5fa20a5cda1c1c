//! Configuration file loading for fleet-status.
//!
//! Discovers and loads `fleet-status.toml` from the working directory.
//! Every section is optional; missing keys fall back to defaults.

use crate::duplicates::ResolutionCriteria;
use crate::status::{CanonicalStatus, StatusNormalizer};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "fleet-status.toml";

/// Top-level configuration from fleet-status.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub matching: MatchingConfig,
    pub maintenance: MaintenanceConfig,
    pub duplicates: DuplicatesConfig,
    pub statuses: StatusesConfig,
    pub storage: StorageConfig,
}

/// Name resolution settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum similarity for a fuzzy match to count as found.
    pub fuzzy_threshold: f64,

    /// Maximum number of alternatives/suggestions returned.
    pub max_alternatives: usize,

    /// Longest vehicle name accepted from a request.
    pub max_name_length: usize,

    /// Tokens ignored by keyword matching.
    pub stop_words: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.7,
            max_alternatives: 3,
            max_name_length: 100,
            stop_words: ["the", "and", "for", "with", "of", "car", "vehicle"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Maintenance-history heuristics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// "good" claimed this many days after the last service is suspicious.
    pub good_stale_after_days: i64,

    /// "poor" claimed within this many days of a service is suspicious.
    pub poor_fresh_within_days: i64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            good_stale_after_days: 60,
            poor_fresh_within_days: 7,
        }
    }
}

/// Which duplicate registry row a batch update should target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePreference {
    #[default]
    RegistryOrder,
    Older,
    RecentMaintenance,
    Status,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuplicatesConfig {
    pub prefer: DuplicatePreference,

    /// Used when `prefer = "status"`.
    pub preferred_status: Option<CanonicalStatus>,
}

impl DuplicatesConfig {
    pub fn criteria(&self) -> ResolutionCriteria {
        match self.prefer {
            DuplicatePreference::RegistryOrder => ResolutionCriteria::default(),
            DuplicatePreference::Older => ResolutionCriteria::prefer_older(),
            DuplicatePreference::RecentMaintenance => ResolutionCriteria::prefer_recent_maintenance(),
            DuplicatePreference::Status => match self.preferred_status {
                Some(status) => ResolutionCriteria::preferred_status(status),
                None => ResolutionCriteria::default(),
            },
        }
    }
}

/// Extra status synonyms on top of the built-in table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusesConfig {
    pub poor: Vec<String>,
    pub average: Vec<String>,
    pub good: Vec<String>,
}

impl StatusesConfig {
    pub fn normalizer(&self) -> StatusNormalizer {
        let extra = self
            .poor
            .iter()
            .map(|s| (s.as_str(), CanonicalStatus::Poor))
            .chain(self.average.iter().map(|s| (s.as_str(), CanonicalStatus::Average)))
            .chain(self.good.iter().map(|s| (s.as_str(), CanonicalStatus::Good)));
        StatusNormalizer::with_synonyms(extra)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path.
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("fleet.db"),
        }
    }
}

/// Discover the config file in `dir`.
pub fn discover_config(dir: &Path) -> Option<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path.display());
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path.display());
        None
    }
}

/// Load and parse a config file.
pub fn load_config(path: &Path) -> Result<FleetConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path.display()))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> Result<FleetConfig> {
    let config: FleetConfig = toml::from_str(contents).context("invalid TOML")?;
    anyhow::ensure!(
        (0.0..=1.0).contains(&config.matching.fuzzy_threshold),
        "matching.fuzzy_threshold must be within [0, 1], got {}",
        config.matching.fuzzy_threshold
    );
    Ok(config)
}

/// Load config from `dir`, or return defaults if not found.
pub fn load_or_default(dir: &Path) -> Result<FleetConfig> {
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(FleetConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FleetConfig::default();

        assert_eq!(config.matching.fuzzy_threshold, 0.7);
        assert_eq!(config.matching.max_alternatives, 3);
        assert_eq!(config.maintenance.good_stale_after_days, 60);
        assert_eq!(config.maintenance.poor_fresh_within_days, 7);
        assert_eq!(config.duplicates.prefer, DuplicatePreference::RegistryOrder);
        assert_eq!(config.storage.database, PathBuf::from("fleet.db"));
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"
            [matching]
            fuzzy_threshold = 0.8

            [duplicates]
            prefer = "status"
            preferred_status = "poor"

            [statuses]
            good = ["mint", "showroom"]
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.fuzzy_threshold, 0.8);
        assert_eq!(config.matching.max_alternatives, 3);
        assert_eq!(
            config.duplicates.criteria(),
            ResolutionCriteria::preferred_status(CanonicalStatus::Poor)
        );

        let normalizer = config.statuses.normalizer();
        assert_eq!(normalizer.normalize("Showroom").unwrap(), CanonicalStatus::Good);
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let err = parse_config("[matching]\nfuzzy_threshold = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("fuzzy_threshold"));
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(dir.path()).unwrap();
        assert_eq!(config.matching.fuzzy_threshold, 0.7);

        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[maintenance]\ngood_stale_after_days = 30\n",
        )
        .unwrap();
        let config = load_or_default(dir.path()).unwrap();
        assert_eq!(config.maintenance.good_stale_after_days, 30);
        assert_eq!(config.maintenance.poor_fresh_within_days, 7);
    }
}
