//! Watcher error types.

use std::fmt;

/// Watcher errors.
///
/// All variants except `Config` are fatal to a running session: the watch
/// loop emits one error event and stops. `Config` errors are returned
/// synchronously before any backend interaction.
//
// Display/Error/From are implemented by hand rather than derived with
// thiserror: the `UnknownNotification.source` field name would be picked
// up by thiserror's implicit source-field rule, which requires it to
// implement `std::error::Error`.
#[derive(Debug)]
pub enum Error {
    /// Invalid watch configuration.
    Config(String),

    /// Notification decode error.
    Protocol(sqlwatch_proto::Error),

    /// A backend query or subscribe call failed.
    Backend(String),

    /// The backend rejected a subscription's statement as not subscribable.
    InvalidStatement {
        /// Name of the offending subscription.
        subscription: String,
        /// The sql text that was registered.
        sql: String,
    },

    /// A notification carried a (source, reason) pair this watcher does
    /// not understand.
    UnknownNotification {
        /// The wire source string.
        source: String,
        /// The wire info string.
        reason: String,
        /// Name carried in the correlation payload.
        subscription: String,
    },

    /// A notification named a subscription this session never registered.
    UnknownSubscription(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Protocol(e) => write!(f, "protocol error: {e}"),
            Error::Backend(msg) => write!(f, "backend error: {msg}"),
            Error::InvalidStatement { subscription, sql } => write!(
                f,
                "statement for subscription '{subscription}' is not subscribable: {sql}"
            ),
            Error::UnknownNotification {
                source,
                reason,
                subscription,
            } => write!(
                f,
                "unknown notification: source '{source}', reason '{reason}' for subscription '{subscription}'"
            ),
            Error::UnknownSubscription(name) => {
                write!(f, "notification for unknown subscription '{name}'")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlwatch_proto::Error> for Error {
    fn from(e: sqlwatch_proto::Error) -> Self {
        Error::Protocol(e)
    }
}
