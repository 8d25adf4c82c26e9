//! Queue draining and subscription registration.

use std::sync::Arc;

use sqlwatch_proto::Notification;

use crate::backend::{receive_sql, SubscribableDatabase, SubscribeRequest};
use crate::error::Error;
use crate::registry::{Subscription, SubscriptionRegistry};

/// Registers subscriptions against the backend, draining the notification
/// queue before each registration.
pub struct SubscriptionEngine<B> {
    backend: Arc<B>,
    queue: String,
}

impl<B: SubscribableDatabase> SubscriptionEngine<B> {
    /// Create an engine for one session's queue.
    pub fn new(backend: Arc<B>, queue: impl Into<String>) -> Self {
        Self {
            backend,
            queue: queue.into(),
        }
    }

    /// Discard every notification currently sitting in the queue.
    ///
    /// Issues non-blocking receives until one comes back empty. There is no
    /// iteration bound: a producer that enqueues faster than this drains
    /// can stall startup indefinitely. Decode errors propagate even though
    /// the drained messages are about to be discarded.
    pub async fn drain_queue(&self) -> Result<(), Error> {
        let sql = receive_sql(&self.queue);
        let mut discarded = 0u64;

        loop {
            let rows = self.backend.query(&sql).await?;
            match Notification::from_rows(&rows)? {
                None => break,
                Some(stale) => {
                    discarded += 1;
                    tracing::trace!(
                        subscription = %stale.subscription,
                        watcher_id = %stale.watcher_id,
                        "discarded stale notification"
                    );
                }
            }
        }

        if discarded > 0 {
            tracing::debug!(queue = %self.queue, discarded, "drained notification queue");
        }
        Ok(())
    }

    /// Register one subscription: full drain, then a single subscribe call.
    ///
    /// The drain avoids racing the backend's own delivery for this
    /// registration on the shared queue.
    pub async fn register_one(&self, subscription: &Subscription) -> Result<(), Error> {
        self.drain_queue().await?;

        let request = SubscribeRequest {
            queue: subscription.queue.clone(),
            options: subscription.options.clone(),
            timeout: subscription.timeout,
            message: subscription.message.clone(),
            sql: subscription.sql.clone(),
        };
        self.backend.subscribe(&request).await?;

        tracing::debug!(subscription = %subscription.name, "subscription registered");
        Ok(())
    }

    /// Register every subscription in the registry, strictly one at a time.
    ///
    /// Sequential because each registration drains the single shared queue
    /// first; concurrent registrations would race on that drain. Stops at
    /// the first failure.
    pub async fn register_all(&self, registry: &SubscriptionRegistry) -> Result<(), Error> {
        for subscription in registry.iter() {
            self.register_one(subscription).await?;
        }
        tracing::debug!(count = registry.len(), "all subscriptions registered");
        Ok(())
    }
}
