//! Watch session configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::Error;

/// Configuration for one watch session.
///
/// `queue`, `options`, and at least one subscription are required;
/// validation happens synchronously in [`crate::watch`] before any
/// backend call is made.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Name of the notification queue to receive from.
    pub queue: String,

    /// Opaque backend-specific subscribe options.
    pub options: String,

    /// Watched subscriptions: name to sql.
    pub subscriptions: BTreeMap<String, String>,

    /// Fetch fresh results on each change event, or emit without a result.
    pub fetch_results: bool,

    /// Backend-side subscription timeout passed through on registration.
    pub timeout: Option<Duration>,
}

impl WatchConfig {
    /// Create a configuration for a queue with the given subscribe options.
    pub fn new(queue: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            options: options.into(),
            subscriptions: BTreeMap::new(),
            fetch_results: false,
            timeout: None,
        }
    }

    /// Add one named subscription.
    pub fn subscribe(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.subscriptions.insert(name.into(), sql.into());
        self
    }

    /// Replace the subscription mapping.
    pub fn with_subscriptions(mut self, subscriptions: BTreeMap<String, String>) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Fetch fresh results when a subscription fires.
    pub fn with_fetch_results(mut self, fetch: bool) -> Self {
        self.fetch_results = fetch;
        self
    }

    /// Set the backend-side subscription timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), Error> {
        if self.queue.is_empty() {
            return Err(Error::Config("queue name is required".to_string()));
        }
        if self.options.is_empty() {
            return Err(Error::Config("subscribe options are required".to_string()));
        }
        if self.subscriptions.is_empty() {
            return Err(Error::Config(
                "at least one subscription is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WatchConfig::new("change_queue", "service=notify")
            .subscribe("orders", "SELECT id FROM dbo.orders")
            .with_fetch_results(true)
            .with_timeout(Duration::from_secs(300));

        assert_eq!(config.queue, "change_queue");
        assert_eq!(config.options, "service=notify");
        assert_eq!(config.subscriptions.len(), 1);
        assert!(config.fetch_results);
        assert_eq!(config.timeout, Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fetch_results_defaults_off() {
        let config = WatchConfig::new("q", "o").subscribe("s", "SELECT 1");
        assert!(!config.fetch_results);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_validate_requires_queue() {
        let config = WatchConfig::new("", "o").subscribe("s", "SELECT 1");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_requires_options() {
        let config = WatchConfig::new("q", "").subscribe("s", "SELECT 1");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_requires_subscriptions() {
        let config = WatchConfig::new("q", "o");
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
