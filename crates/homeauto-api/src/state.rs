//! Application state shared across handlers.

use std::sync::Arc;

use homeauto_core::{ProbeAggregator, SearchReadingStore};

use crate::config::{Config, ConfigError};

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Resolves the environment snapshot for each request.
    pub aggregator: ProbeAggregator,
}

impl AppState {
    /// Create new application state.
    pub fn new(aggregator: ProbeAggregator) -> Arc<Self> {
        Arc::new(Self { aggregator })
    }

    /// Build the aggregator and its search-backed reading store from config.
    pub fn from_config(config: &Config) -> Result<Arc<Self>, ConfigError> {
        let store = SearchReadingStore::new(&config.readings.search_url, config.readings.timeout())?
            .timestamp_field(&config.readings.timestamp_field);
        let aggregator =
            ProbeAggregator::new(Arc::new(store), config.slot_map()?, config.readings.window)?;

        Ok(Self::new(aggregator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        let mut config = Config::default();
        config.probes.insert("A".to_string(), "pool".to_string());
        config.probes.insert("B".to_string(), "shade".to_string());
        config
    }

    #[test]
    fn test_from_config() {
        let state = AppState::from_config(&config()).unwrap();

        assert_eq!(state.aggregator.window(), 10);
        assert_eq!(state.aggregator.slots().len(), 2);
    }

    #[test]
    fn test_from_config_rejects_small_window() {
        let mut config = config();
        config.readings.window = 1;

        let result = AppState::from_config(&config);

        assert!(matches!(
            result,
            Err(ConfigError::Setup(homeauto_core::Error::InvalidConfig(_)))
        ));
    }
}
