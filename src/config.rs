//! # Configuration Management
//!
//! This module handles loading and parsing configuration from `regatta-config.toml`.
//! It configures the tide refresh timer, the optional live harmonic feed, the
//! series discard policy, and the tide stations used by the model.

use crate::fallback::Jitter;
use crate::scoring::DiscardPolicy;
use crate::station::{regional_stations, TideStation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "regatta-config.toml";

/// Application configuration loaded from regatta-config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Tide snapshot refresh and fallback presentation
    pub tide: TideConfig,
    /// Live harmonic constants feed
    pub feed: FeedConfig,
    /// Series scoring rules
    pub scoring: ScoringConfig,
    /// Stations to model; empty means the built-in regional constants
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stations: Vec<TideStation>,
}

/// Tide service configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TideConfig {
    /// Seconds between station snapshot refreshes
    pub refresh_interval_secs: u64,
    /// Maximum cosmetic jitter (metres) on fallback heights, 0 disables it
    pub fallback_jitter_m: f64,
    /// Seed for the jitter RNG; random when unset
    pub jitter_seed: Option<u64>,
}

/// Live harmonic feed configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Query the feed at startup (the regional constants are used otherwise)
    pub enabled: bool,
    /// NOAA CO-OPS metadata API stations endpoint
    pub base_url: String,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Directory for cached feed responses
    pub cache_dir: PathBuf,
    /// Cache TTL in minutes
    pub cache_ttl_minutes: u64,
}

/// Series scoring configuration
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub discard_policy: DiscardPolicy,
}

impl Default for TideConfig {
    fn default() -> Self {
        TideConfig {
            refresh_interval_secs: 60,
            fallback_jitter_m: 0.0,
            jitter_seed: None,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            enabled: false,
            base_url: "https://api.tidesandcurrents.noaa.gov/mdapi/prod/webapi/stations"
                .to_string(),
            timeout_secs: 10,
            cache_dir: std::env::temp_dir().join("regatta-tide"),
            cache_ttl_minutes: 30,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes * 60)
    }
}

impl Config {
    /// Load configuration from regatta-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        stations = config.stations.len(),
                        "loaded configuration"
                    );
                    config
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Save current configuration to regatta-config.toml
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(CONFIG_FILE)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Stations to model: the configured list, or the regional constants.
    pub fn stations(&self) -> Vec<TideStation> {
        if self.stations.is_empty() {
            regional_stations()
        } else {
            self.stations.clone()
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.tide.refresh_interval_secs.max(1))
    }

    /// Jitter source for fallback heights, if enabled.
    pub fn jitter(&self) -> Option<Jitter> {
        let max_m = self.tide.fallback_jitter_m;
        if max_m <= 0.0 || !max_m.is_finite() {
            return None;
        }
        Some(match self.tide.jitter_seed {
            Some(seed) => Jitter::seeded(seed, max_m),
            None => Jitter::from_entropy(max_m),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonic::Constituent;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tide.refresh_interval_secs, 60);
        assert_eq!(config.tide.fallback_jitter_m, 0.0);
        assert!(!config.feed.enabled);
        assert_eq!(config.feed.cache_ttl_minutes, 30);
        assert_eq!(config.scoring.discard_policy, DiscardPolicy::Standard);
        assert!(config.stations.is_empty());
        assert_eq!(config.stations().len(), 2);
        assert!(config.jitter().is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.stations = regional_stations();
        config.scoring.discard_policy = DiscardPolicy::Fixed(2);

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.stations, config.stations);
        assert_eq!(parsed.scoring.discard_policy, DiscardPolicy::Fixed(2));
        assert_eq!(parsed.feed.base_url, config.feed.base_url);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let contents = r#"
[tide]
refresh_interval_secs = 15
fallback_jitter_m = 0.02
jitter_seed = 42

[scoring]
discard_policy = "no_discards"

[[stations]]
id = "9999999"
name = "Race Area"
mean_level_m = 1.2

[stations.location]
latitude = 50.1
longitude = -5.0

[[stations.constituents]]
constituent = "M2"
amplitude_m = 1.5
phase_deg = 120.0
"#;
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.refresh_interval(), Duration::from_secs(15));
        assert_eq!(config.scoring.discard_policy, DiscardPolicy::NoDiscards);
        assert!(!config.feed.enabled);
        assert!(config.jitter().is_some());

        let stations = config.stations();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].location.latitude(), 50.1);
        assert_eq!(stations[0].constituents[0].constituent, Constituent::M2);
    }

    #[test]
    fn test_invalid_station_location_falls_back() {
        let contents = r#"
[[stations]]
id = "1"
name = "Nowhere"
mean_level_m = 1.0
constituents = []

[stations.location]
latitude = 123.0
longitude = 0.0
"#;
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), contents).unwrap();

        let config = Config::load_from_path(file.path());
        assert!(config.stations.is_empty());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        assert_eq!(config.tide.refresh_interval_secs, 60);
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.tide.refresh_interval_secs = 120;
        config.save_to_path(file.path()).unwrap();

        let reloaded = Config::load_from_path(file.path());
        assert_eq!(reloaded.tide.refresh_interval_secs, 120);
    }
}
