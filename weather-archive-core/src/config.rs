use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{chart::RendererConfig, model::Coordinate};

/// Coordinate used when geocoding yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for FallbackLocation {
    fn default() -> Self {
        Self { latitude: 28.6519, longitude: 77.2315 }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// output_dir = "plots"
/// default_place = "Lisbon"
///
/// [fallback]
/// latitude = 38.72
/// longitude = -9.14
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory receiving the raw JSON, selected CSV and chart of every run.
    pub output_dir: PathBuf,

    /// Append-only CSV with one row per run.
    pub run_log: PathBuf,

    pub archive_url: String,
    pub geocoding_url: String,

    /// Timeout applied to each network call.
    pub timeout_secs: u64,

    /// Place used when the user gives a blank name.
    pub default_place: String,

    pub fallback: FallbackLocation,
    pub chart: RendererConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("plots"),
            run_log: PathBuf::from("saved_data_log.csv"),
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            timeout_secs: 10,
            default_place: "New Delhi".to_string(),
            fallback: FallbackLocation::default(),
            chart: RendererConfig::default(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The fallback location as a validated coordinate.
    pub fn fallback_coordinate(&self) -> Result<Coordinate> {
        Coordinate::new(self.fallback.latitude, self.fallback.longitude)
            .context("Invalid [fallback] location in config")
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.fallback_coordinate()?;
        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-archive", "weather-archive")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_open_meteo_and_new_delhi() {
        let cfg = Config::default();

        assert_eq!(cfg.output_dir, PathBuf::from("plots"));
        assert_eq!(cfg.run_log, PathBuf::from("saved_data_log.csv"));
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.default_place, "New Delhi");

        let fallback = cfg.fallback_coordinate().expect("default fallback is valid");
        assert_eq!(fallback.latitude(), 28.6519);
        assert_eq!(fallback.longitude(), 77.2315);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let cfg = Config::from_toml(
            r#"
            output_dir = "out"

            [chart]
            width = 640
            "#,
        )
        .expect("partial config must parse");

        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.chart.width, 640);
        assert_eq!(cfg.chart.height, RendererConfig::default().height);
        assert_eq!(cfg.default_place, "New Delhi");
        assert_eq!(cfg.archive_url, Config::default().archive_url);
    }

    #[test]
    fn out_of_range_fallback_is_rejected() {
        let err = Config::from_toml(
            r#"
            [fallback]
            latitude = 120.0
            longitude = 0.0
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Invalid [fallback] location"));
    }

    #[test]
    fn saved_form_parses_back() {
        let mut cfg = Config::default();
        cfg.default_place = "Lisbon".into();

        let text = toml::to_string_pretty(&cfg).expect("config serializes");
        let parsed = Config::from_toml(&text).expect("serialized config parses");

        assert_eq!(parsed, cfg);
    }
}
