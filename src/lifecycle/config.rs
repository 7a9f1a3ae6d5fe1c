//! Sync layer configuration.

use crate::model::DEFAULT_PRICE_THRESHOLD;
use crate::session::MergePolicy;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not parse configuration: {0}")]
    Parse(#[from] clap::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Basket sync configuration
#[derive(Debug, Clone, PartialEq, Eq, Parser, Deserialize)]
#[command(name = "basket-sync", about = "Cart and wishlist sync demo", long_about = None)]
#[serde(default)]
pub struct SyncConfig {
    /// Cart item count from which the total price is shown
    #[arg(long, env = "BASKET_SYNC_PRICE_THRESHOLD", default_value_t = DEFAULT_PRICE_THRESHOLD)]
    pub price_threshold: u32,

    /// How guest items are merged into the account at login
    #[arg(long, env = "BASKET_SYNC_MERGE_POLICY", value_enum, default_value_t = MergePolicy::Additive)]
    pub merge_policy: MergePolicy,

    /// Capacity of each actor mailbox
    #[arg(long, env = "BASKET_SYNC_STORE_BUFFER", default_value_t = 32)]
    pub store_buffer: usize,

    /// Directory of the persistent cache; in-memory when unset
    #[arg(long, env = "BASKET_SYNC_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            price_threshold: DEFAULT_PRICE_THRESHOLD,
            merge_policy: MergePolicy::default(),
            store_buffer: 32,
            cache_dir: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed or is invalid
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        let config = Self::try_parse()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.price_threshold == 0 {
            return Err(ConfigError::Invalid(
                "price_threshold must be at least 1".into(),
            ));
        }
        if self.store_buffer == 0 {
            return Err(ConfigError::Invalid("store_buffer must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_merge_policy(mut self, merge_policy: MergePolicy) -> Self {
        self.merge_policy = merge_policy;
        self
    }

    pub fn with_price_threshold(mut self, price_threshold: u32) -> Self {
        self.price_threshold = price_threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::try_parse_from(["basket-sync"]).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let config = SyncConfig::try_parse_from([
            "basket-sync",
            "--price-threshold",
            "6",
            "--merge-policy",
            "overwrite",
        ])
        .unwrap();
        assert_eq!(config.price_threshold, 6);
        assert_eq!(config.merge_policy, MergePolicy::Overwrite);
    }

    #[test]
    fn test_zero_threshold_is_invalid() {
        let config = SyncConfig::default().with_price_threshold(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: SyncConfig = serde_json::from_str(r#"{ "merge_policy": "prompt" }"#).unwrap();
        assert_eq!(config.merge_policy, MergePolicy::Prompt);
        assert_eq!(config.price_threshold, DEFAULT_PRICE_THRESHOLD);
    }
}
