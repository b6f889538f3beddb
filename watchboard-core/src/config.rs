//! Watchboard configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use crate::data::Lookback;
use crate::domain::{Interval, OWNED_CATEGORY};
use crate::indicators::IndicatorSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchboardConfig {
    /// Path of the persisted cache document.
    pub cache_file: PathBuf,
    /// Path of the watchlist JSON file.
    pub watchlist_file: PathBuf,
    /// Categories refreshed by a full cycle, in order.
    pub categories: Vec<String>,
    /// Categories whose instruments are funds; their cache keys use the
    /// `funds:` namespace.
    pub fund_categories: Vec<String>,
    pub indicators: IndicatorSettings,
    pub provider: ProviderSettings,
}

impl Default for WatchboardConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("cache/stock_data.json"),
            watchlist_file: PathBuf::from("list_watchlist.json"),
            categories: [
                OWNED_CATEGORY,
                "Information Technology",
                "Financial Services",
                "Industrials",
                "Energy & Utilities",
                "Healthcare",
                "Communication Services",
                "Real Estate",
                "Consumer Staples",
                "Consumer Discretionary",
                "ETFs",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fund_categories: vec!["ETFs".to_string()],
            indicators: IndicatorSettings::default(),
            provider: ProviderSettings::default(),
        }
    }
}

/// Market-data request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub daily_lookback_days: u32,
    pub intraday_interval: Interval,
    pub intraday_lookback_days: u32,
    /// Symbols per batched bar request.
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            daily_lookback_days: 365,
            intraday_interval: Interval::Hourly,
            intraday_lookback_days: 90,
            batch_size: 25,
            timeout_secs: 30,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

impl ProviderSettings {
    pub fn daily_lookback(&self) -> Lookback {
        Lookback::days(self.daily_lookback_days)
    }

    pub fn intraday_lookback(&self) -> Lookback {
        Lookback::days(self.intraday_lookback_days)
    }
}

impl WatchboardConfig {
    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from a TOML file if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ind = &self.indicators;
        if ind.rsi_window == 0 || ind.intraday_rsi_window == 0 || ind.atr_window == 0 {
            return Err(ConfigError::Invalid("indicator windows must be >= 1".into()));
        }
        if self.provider.daily_lookback_days < 365 {
            return Err(ConfigError::Invalid(
                "daily_lookback_days must cover at least one year (365)".into(),
            ));
        }
        if self.provider.intraday_lookback_days == 0 {
            return Err(ConfigError::Invalid("intraday_lookback_days must be >= 1".into()));
        }
        if self.provider.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be >= 1".into()));
        }
        if self.categories.is_empty() {
            return Err(ConfigError::Invalid("at least one category is required".into()));
        }
        Ok(())
    }
}
