//! Configuration: series catalog, default dates, fetch behavior.
//!
//! Loaded from TOML. Every section falls back to defaults, so a file only needs
//! the keys it changes. Lookup order (first hit wins):
//!
//! 1. `--config <path>`
//! 2. `$FRED_DASH_CONFIG`
//! 3. `./fred-dash.toml`
//! 4. built-in defaults
//!
//! A file named explicitly (1 or 2) must exist; the default location may not.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chart::AssembleOptions;
use crate::domain::{FailurePolicy, SeriesId, SourceKind};
use crate::error::AppError;

const CONFIG_ENV_VAR: &str = "FRED_DASH_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "fred-dash.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub dates: DatesConfig,
    pub fetch: FetchConfig,
}

/// One selectable series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: SeriesId,
    #[serde(default)]
    pub label: String,
}

impl CatalogEntry {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: SeriesId::new(id),
            label: label.to_string(),
        }
    }

    /// Label for lists; falls back to the id.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.id.as_str()
        } else {
            &self.label
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub series: Vec<CatalogEntry>,
    /// Series selected when the dashboard opens.
    pub default_selection: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            series: vec![
                CatalogEntry::new("MORTGAGE30US", "30-Year Fixed Rate Mortgage Average"),
                CatalogEntry::new("MORTGAGE15US", "15-Year Fixed Rate Mortgage Average"),
                CatalogEntry::new("MORTGAGE5US", "5/1-Year Adjustable Rate Mortgage Average"),
            ],
            default_selection: vec!["MORTGAGE30US".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatesConfig {
    /// Raw start date; parsed like any user input. The end defaults to today.
    pub default_start: String,
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            default_start: "2000-01-01".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub source: SourceKind,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub max_workers: usize,
    pub on_error: FailurePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Auto,
            timeout_secs: 20,
            max_workers: 4,
            on_error: FailurePolicy::Abort,
        }
    }
}

impl Config {
    /// Resolve and load the configuration (see module docs for lookup order).
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, AppError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(&PathBuf::from(path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load(default_path);
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(content).map_err(|e| AppError::new(2, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.catalog.series.is_empty() {
            return Err(AppError::new(2, "catalog.series must list at least one series"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::new(2, "fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_workers == 0 {
            return Err(AppError::new(2, "fetch.max_workers must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs)
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            max_workers: self.fetch.max_workers,
            on_error: self.fetch.on_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_mortgage_catalog() {
        let config = Config::default();
        let ids: Vec<&str> = config.catalog.series.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["MORTGAGE30US", "MORTGAGE15US", "MORTGAGE5US"]);
        assert_eq!(config.catalog.default_selection, vec!["MORTGAGE30US"]);
        assert_eq!(config.fetch.on_error, FailurePolicy::Abort);
        assert_eq!(config.timeout(), Duration::from_secs(20));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [fetch]
            max_workers = 1
            on_error = "skip"
            source = "graph"
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.max_workers, 1);
        assert_eq!(config.fetch.on_error, FailurePolicy::Skip);
        assert_eq!(config.fetch.source, SourceKind::Graph);
        assert_eq!(config.fetch.timeout_secs, 20);
        assert_eq!(config.catalog, CatalogConfig::default());
        assert_eq!(config.dates.default_start, "2000-01-01");
    }

    #[test]
    fn custom_catalog_entries_allow_missing_labels() {
        let config = Config::from_toml_str(
            r#"
            [catalog]
            series = [{ id = "DGS10" }, { id = "T10Y2Y", label = "10Y minus 2Y" }]
            default_selection = ["DGS10", "T10Y2Y"]
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.series[0].display_label(), "DGS10");
        assert_eq!(config.catalog.series[1].display_label(), "10Y minus 2Y");
    }

    #[test]
    fn unknown_source_is_rejected() {
        let err = Config::from_toml_str("[fetch]\nsource = \"bloomberg\"\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn zero_workers_and_empty_catalog_are_rejected() {
        assert!(Config::from_toml_str("[fetch]\nmax_workers = 0\n").is_err());
        assert!(Config::from_toml_str("[fetch]\ntimeout_secs = 0\n").is_err());
        assert!(Config::from_toml_str("[catalog]\nseries = []\n").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::resolve(Some(&missing)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.toml");
        fs::write(&path, "[dates]\ndefault_start = \"2010/01/01\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.dates.default_start, "2010/01/01");
    }
}
