//! TOML run configuration.
//!
//! Every section has defaults, so an empty or partial file (or no file at
//! all) describes a valid run against the public endpoints.
//!
//! ```toml
//! output_path = "site/data.json"
//! lookback_days = 730
//!
//! [volatility]
//! currency = "BTC"
//! max_window_days = 365
//!
//! [bands]
//! low = 40.0
//! high = 60.0
//! ```

use chrono::TimeDelta;
use dvolwatch_core::data::blockchain::BLOCKCHAIN_BASE_URL;
use dvolwatch_core::data::deribit::DERIBIT_BASE_URL;
use dvolwatch_core::data::http::DEFAULT_USER_AGENT;
use dvolwatch_core::VolatilityBands;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Upper bound for `lookback_days` and `volatility.max_window_days`.
pub const MAX_SPAN_DAYS: u32 = 36_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration for one fetch-align-write pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the summary JSON is written. Overwritten on every run.
    pub output_path: PathBuf,
    /// How far back from now both series are requested.
    pub lookback_days: u32,
    pub http: HttpConfig,
    pub volatility: VolatilityConfig,
    pub price: PriceConfig,
    pub bands: VolatilityBands,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("data.json"),
            lookback_days: 365,
            http: HttpConfig::default(),
            volatility: VolatilityConfig::default(),
            price: PriceConfig::default(),
            bands: VolatilityBands::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Deribit DVOL source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VolatilityConfig {
    pub base_url: String,
    pub currency: String,
    pub resolution: String,
    /// Widest span Deribit accepts in one request.
    pub max_window_days: u32,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            base_url: DERIBIT_BASE_URL.to_string(),
            currency: "BTC".to_string(),
            resolution: "1D".to_string(),
            max_window_days: 365,
        }
    }
}

/// blockchain.com price source settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PriceConfig {
    pub base_url: String,
    pub sampled: bool,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: BLOCKCHAIN_BASE_URL.to_string(),
            sampled: true,
        }
    }
}

impl Config {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_path must not be empty".into()));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be positive".into()));
        }
        if self.lookback_days > MAX_SPAN_DAYS {
            return Err(ConfigError::Invalid(format!(
                "lookback_days ({}) must be at most {MAX_SPAN_DAYS}",
                self.lookback_days
            )));
        }
        if self.volatility.max_window_days == 0 {
            return Err(ConfigError::Invalid(
                "volatility.max_window_days must be positive".into(),
            ));
        }
        if self.volatility.max_window_days > MAX_SPAN_DAYS {
            return Err(ConfigError::Invalid(format!(
                "volatility.max_window_days ({}) must be at most {MAX_SPAN_DAYS}",
                self.volatility.max_window_days
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be positive".into()));
        }
        let (low, high) = (self.bands.low, self.bands.high);
        if low.is_nan() || high.is_nan() || low >= high {
            return Err(ConfigError::Invalid(format!(
                "bands.low ({low}) must be below bands.high ({high})"
            )));
        }
        Ok(())
    }

    pub fn lookback(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.lookback_days))
    }

    pub fn max_window(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.volatility.max_window_days))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output_path, PathBuf::from("data.json"));
        assert_eq!(config.lookback(), TimeDelta::days(365));
        assert_eq!(config.max_window(), TimeDelta::days(365));
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.volatility.currency, "BTC");
        assert_eq!(config.volatility.resolution, "1D");
        assert!(config.price.sampled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            output_path = "site/data.json"
            lookback_days = 730

            [volatility]
            currency = "ETH"

            [bands]
            low = 35.0
            high = 70.0
            "#,
        )
        .unwrap();
        assert_eq!(config.output_path, PathBuf::from("site/data.json"));
        assert_eq!(config.lookback_days, 730);
        assert_eq!(config.volatility.currency, "ETH");
        assert_eq!(config.volatility.max_window_days, 365);
        assert_eq!(config.volatility.base_url, DERIBIT_BASE_URL);
        assert_eq!(config.bands.low, 35.0);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn rejects_zero_lookback() {
        let err = Config::from_toml_str("lookback_days = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_window() {
        let err = Config::from_toml_str("[volatility]\nmax_window_days = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_lookback_beyond_limit() {
        let err = Config::from_toml_str("lookback_days = 4000000000").unwrap_err();
        assert!(err.to_string().contains("lookback_days"));
        assert!(Config::from_toml_str("lookback_days = 36500").is_ok());
        assert!(Config::from_toml_str("lookback_days = 36501").is_err());
    }

    #[test]
    fn rejects_window_beyond_limit() {
        let err =
            Config::from_toml_str("[volatility]\nmax_window_days = 200000000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("max_window_days")));
    }

    #[test]
    fn rejects_inverted_bands() {
        let err = Config::from_toml_str("[bands]\nlow = 60.0\nhigh = 40.0").unwrap_err();
        assert!(err.to_string().contains("bands.low"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = Config::from_toml_str("lookback_days = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/nonexistent/dvolwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
