//! The backend seam: a subscribable database.

use std::time::Duration;

use async_trait::async_trait;

use sqlwatch_proto::QueryResult;

use crate::error::Error;

/// Everything the watcher asks of one subscription registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeRequest {
    /// Notification queue the backend should deliver to.
    pub queue: String,
    /// Opaque backend-specific subscribe options.
    pub options: String,
    /// Backend-side subscription timeout, if configured.
    pub timeout: Option<Duration>,
    /// Serialized correlation payload delivered back with each notification.
    pub message: String,
    /// The sql whose result set is watched.
    pub sql: String,
}

/// A database that supports result-set subscriptions.
///
/// The watcher drives the backend through exactly two operations; how the
/// backend connects, pools, or authenticates is its own concern.
#[async_trait]
pub trait SubscribableDatabase: Send + Sync {
    /// Execute arbitrary sql and return its rows.
    ///
    /// Used for the receive statements against the notification queue and,
    /// when result fetching is enabled, for re-running a subscription's sql.
    async fn query(&self, sql: &str) -> Result<QueryResult, Error>;

    /// Register one subscription with the backend.
    async fn subscribe(&self, request: &SubscribeRequest) -> Result<(), Error>;
}

/// Build the non-blocking receive statement for a queue.
///
/// The statement shape is a backend protocol contract and must be
/// reproduced verbatim when retargeting the same notification mechanism.
pub fn receive_sql(queue: &str) -> String {
    format!("RECEIVE * FROM {}", queue)
}

/// Build the blocking (server-side wait) receive statement for a queue.
pub fn blocking_receive_sql(queue: &str) -> String {
    format!("WAITFOR (RECEIVE * FROM {})", queue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_sql_shape() {
        assert_eq!(receive_sql("change_queue"), "RECEIVE * FROM change_queue");
        assert_eq!(
            blocking_receive_sql("change_queue"),
            "WAITFOR (RECEIVE * FROM change_queue)"
        );
    }
}
