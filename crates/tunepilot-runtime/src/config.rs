//! Orchestrator configuration.

use std::collections::HashMap;
use std::time::Duration;

use tunepilot_models::Provider;
use tunepilot_uploader::Destination;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Where finished artifacts are delivered.
    pub destination: Destination,
    /// Concurrent downloads allowed per provider.
    pub concurrency: HashMap<Provider, usize>,
    /// First retry delay; doubles per attempt.
    pub base_backoff: Duration,
    /// Upper bound on the retry delay.
    pub max_backoff: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            destination: Destination::Chat,
            concurrency: Provider::ALL.iter().map(|p| (*p, 3)).collect(),
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            event_capacity: 256,
        }
    }
}

impl OrchestratorConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delivery destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Sets the concurrency limit for one provider.
    pub fn with_concurrency(mut self, provider: Provider, limit: usize) -> Self {
        self.concurrency.insert(provider, limit.max(1));
        self
    }

    /// Sets the retry backoff bounds.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff = base;
        self.max_backoff = max;
        self
    }

    /// The concurrency limit for a provider.
    pub fn concurrency_for(&self, provider: Provider) -> usize {
        self.concurrency.get(&provider).copied().unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.destination, Destination::Chat);
        assert_eq!(config.concurrency_for(Provider::Tidal), 3);
        assert_eq!(config.base_backoff, Duration::from_secs(2));
    }

    #[test]
    fn test_config_builder() {
        let config = OrchestratorConfig::new()
            .with_concurrency(Provider::Tidal, 5)
            .with_concurrency(Provider::Apple, 0)
            .with_backoff(Duration::from_millis(10), Duration::from_millis(100));

        assert_eq!(config.concurrency_for(Provider::Tidal), 5);
        // Zero is clamped to one slot.
        assert_eq!(config.concurrency_for(Provider::Apple), 1);
        assert_eq!(config.max_backoff, Duration::from_millis(100));
    }
}
