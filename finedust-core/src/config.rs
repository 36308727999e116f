use std::{env, fs, path::Path, time::Duration};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{model::ServiceArea, provider::StationStrategy};

/// AirKorea credentials and station-resolution strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirKoreaConfig {
    #[serde(default)]
    pub api_key: String,

    /// "bulk-scan" (default) or "nearby".
    #[serde(default = "default_station_strategy")]
    pub station_strategy: String,
}

impl Default for AirKoreaConfig {
    fn default() -> Self {
        Self { api_key: String::new(), station_strategy: default_station_strategy() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Result TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: default_cache_ttl_secs() }
    }
}

/// Top-level configuration loaded from a TOML file.
///
/// Example:
/// ```toml
/// listen_addr = "0.0.0.0:3000"
/// log_level = "info"
///
/// [air_korea]
/// api_key = "..."
/// station_strategy = "bulk-scan"
///
/// [open_weather]
/// api_key = "..."
///
/// [cache]
/// ttl_secs = 600
///
/// [service_area]
/// min_latitude = 33.0
/// max_latitude = 39.0
/// min_longitude = 124.0
/// max_longitude = 132.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub air_korea: AirKoreaConfig,

    #[serde(default)]
    pub open_weather: OpenWeatherConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// When set, coordinates outside this box are rejected.
    #[serde(default)]
    pub service_area: Option<ServiceArea>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            air_korea: AirKoreaConfig::default(),
            open_weather: OpenWeatherConfig::default(),
            cache: CacheConfig::default(),
            service_area: None,
        }
    }
}

impl Config {
    /// Load config from disk (an absent file yields the defaults), then let
    /// the environment supply or override credentials. Credentials are never
    /// baked into source; `validate` enforces their presence at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(key) = env::var("AIR_KOREA_API_KEY") {
            cfg.air_korea.api_key = key;
        }
        if let Ok(key) = env::var("OPEN_WEATHER_API_KEY") {
            cfg.open_weather.api_key = key;
        }

        Ok(cfg)
    }

    /// Fail-fast startup check: both upstream credentials and a parseable
    /// station strategy are required before the server binds.
    pub fn validate(&self) -> Result<()> {
        if self.air_korea.api_key.trim().is_empty() {
            bail!(
                "AirKorea API key is not configured.\n\
                 Hint: set [air_korea].api_key in the config file or the AIR_KOREA_API_KEY environment variable."
            );
        }
        if self.open_weather.api_key.trim().is_empty() {
            bail!(
                "OpenWeather API key is not configured.\n\
                 Hint: set [open_weather].api_key in the config file or the OPEN_WEATHER_API_KEY environment variable."
            );
        }
        self.station_strategy()?;

        Ok(())
    }

    /// The configured strategy as a strongly-typed value.
    pub fn station_strategy(&self) -> Result<StationStrategy> {
        StationStrategy::try_from(self.air_korea.station_strategy.as_str())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_station_strategy() -> String {
    StationStrategy::BulkScan.as_str().to_string()
}

fn default_cache_ttl_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.cache.ttl_secs, 600);
        assert_eq!(cfg.station_strategy().unwrap(), StationStrategy::BulkScan);
        assert!(cfg.service_area.is_none());
    }

    #[test]
    fn validate_errors_when_air_korea_key_missing() {
        let mut cfg = Config::default();
        cfg.open_weather.api_key = "OW_KEY".to_string();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("AirKorea API key"));
    }

    #[test]
    fn validate_errors_when_open_weather_key_missing() {
        let mut cfg = Config::default();
        cfg.air_korea.api_key = "AK_KEY".to_string();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("OpenWeather API key"));
    }

    #[test]
    fn validate_errors_on_unknown_strategy() {
        let mut cfg = Config::default();
        cfg.air_korea.api_key = "AK_KEY".to_string();
        cfg.open_weather.api_key = "OW_KEY".to_string();
        cfg.air_korea.station_strategy = "teleport".to_string();

        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown station strategy"));
    }

    #[test]
    fn validate_accepts_complete_config() {
        let mut cfg = Config::default();
        cfg.air_korea.api_key = "AK_KEY".to_string();
        cfg.open_weather.api_key = "OW_KEY".to_string();

        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_full_toml() {
        let toml = r#"
            listen_addr = "127.0.0.1:8080"
            log_level = "debug"

            [air_korea]
            api_key = "AK_KEY"
            station_strategy = "nearby"

            [open_weather]
            api_key = "OW_KEY"

            [cache]
            ttl_secs = 300

            [service_area]
            min_latitude = 33.0
            max_latitude = 39.0
            min_longitude = 124.0
            max_longitude = 132.0
        "#;

        let cfg: Config = toml::from_str(toml).expect("valid config");
        assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
        assert_eq!(cfg.station_strategy().unwrap(), StationStrategy::Nearby);
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(300));
        assert!(cfg.service_area.is_some());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: Config = toml::from_str("[air_korea]\napi_key = \"AK_KEY\"\n")
            .expect("valid config");
        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.cache.ttl_secs, 600);
        assert_eq!(cfg.station_strategy().unwrap(), StationStrategy::BulkScan);
    }
}
