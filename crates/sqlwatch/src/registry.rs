//! Subscription records and the per-session registry.

use std::collections::BTreeMap;
use std::time::Duration;

use sqlwatch_proto::CorrelationPayload;

use crate::config::WatchConfig;
use crate::error::Error;

/// One registered subscription.
///
/// Immutable after construction; re-registration re-issues the same record
/// to the backend without changing any field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Unique subscription name.
    pub name: String,
    /// The sql whose result set is watched.
    pub sql: String,
    /// Notification queue the backend delivers to.
    pub queue: String,
    /// Opaque backend-specific subscribe options.
    pub options: String,
    /// Backend-side subscription timeout, if configured.
    pub timeout: Option<Duration>,
    /// Serialized correlation payload for this subscription.
    pub message: String,
}

/// The set of subscriptions for one watch session, keyed by name.
///
/// Read-only after construction; the watch loop only looks names up and
/// iterates for mass re-registration.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    subscriptions: BTreeMap<String, Subscription>,
    watcher_id: String,
}

impl SubscriptionRegistry {
    /// Build the registry from a validated configuration and the session's
    /// watcher id.
    ///
    /// Fails if the configuration holds no subscriptions.
    pub fn from_config(config: &WatchConfig, watcher_id: impl Into<String>) -> Result<Self, Error> {
        let watcher_id = watcher_id.into();
        let mut subscriptions = BTreeMap::new();

        for (name, sql) in &config.subscriptions {
            let message = CorrelationPayload::new(name.clone(), watcher_id.clone()).to_json()?;
            subscriptions.insert(
                name.clone(),
                Subscription {
                    name: name.clone(),
                    sql: sql.clone(),
                    queue: config.queue.clone(),
                    options: config.options.clone(),
                    timeout: config.timeout,
                    message,
                },
            );
        }

        if subscriptions.is_empty() {
            return Err(Error::Config(
                "at least one subscription is required".to_string(),
            ));
        }

        Ok(Self {
            subscriptions,
            watcher_id,
        })
    }

    /// Look up a subscription by name.
    pub fn lookup(&self, name: &str) -> Option<&Subscription> {
        self.subscriptions.get(name)
    }

    /// Iterate over all subscriptions.
    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.values()
    }

    /// Subscription names in this registry.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.keys().map(String::as_str)
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the registry is empty. Never true after construction.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// The session identifier shared by every subscription here.
    pub fn watcher_id(&self) -> &str {
        &self.watcher_id
    }
}
