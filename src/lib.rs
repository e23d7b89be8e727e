//! Wardwatch core library
//!
//! This module exports the core functionality of the Wardwatch hospital
//! operations system: entity services over the remote record store, the
//! client-side patient filter/search/sort pipeline, and the simulated live
//! metrics feed that drives the dashboard.

pub mod error;
pub mod feed;
pub mod filter;
pub mod models;
pub mod services;
pub mod store;

/// Application configuration
pub mod config {
    use serde::Deserialize;

    use crate::feed::FeedConfig;

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct Config {
        pub store: StoreConfig,
        pub feed: FeedConfig,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct StoreConfig {
        /// Page size used when listing the staff directory.
        pub page_limit: usize,
    }

    impl Default for StoreConfig {
        fn default() -> Self {
            StoreConfig { page_limit: 50 }
        }
    }

    /// Load configuration from file
    pub fn load_config() -> Result<Config, config::ConfigError> {
        // Default file first, then the environment-specific file, then
        // WARDWATCH_* environment variables.
        let env = std::env::var("WARDWATCH_ENV").unwrap_or_else(|_| "development".into());
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("WARDWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn defaults_cover_missing_sources() {
            let config = Config::default();
            assert_eq!(config.store.page_limit, 50);
            assert_eq!(config.feed.min_interval_ms, 3_000);
            assert_eq!(config.feed.max_interval_ms, 5_000);
        }
    }
}
