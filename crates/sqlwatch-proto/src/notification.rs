//! Typed notifications decoded from queue messages.

use serde::{Deserialize, Serialize};

use crate::envelope::{decode_message_body, parse_envelope};
use crate::value::Row;
use crate::Error;

/// Column carrying the encoded notification envelope in a receive result.
pub const MESSAGE_BODY_COLUMN: &str = "message_body";

/// Where a notification originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationSource {
    /// The watched result set changed.
    Data,
    /// The backend-side subscription timeout elapsed.
    Timeout,
    /// The subscribed statement itself was rejected.
    Statement,
    /// A source string this watcher does not recognize.
    Other(String),
}

impl NotificationSource {
    fn parse(raw: &str) -> Self {
        match raw {
            "data" => Self::Data,
            "timeout" => Self::Timeout,
            "statement" => Self::Statement,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire-level source string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Data => "data",
            Self::Timeout => "timeout",
            Self::Statement => "statement",
            Self::Other(s) => s,
        }
    }
}

/// Why a notification fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    /// Rows were inserted into the watched result set.
    Insert,
    /// Rows in the watched result set were updated.
    Update,
    /// Rows were deleted from the watched result set.
    Delete,
    /// No change; accompanies timeout notifications.
    None,
    /// The subscribed statement is not subscribable.
    Invalid,
    /// An info string this watcher does not recognize.
    Other(String),
}

impl ChangeReason {
    fn parse(raw: &str) -> Self {
        match raw {
            "insert" => Self::Insert,
            "update" => Self::Update,
            "delete" => Self::Delete,
            "none" => Self::None,
            "invalid" => Self::Invalid,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire-level info string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::None => "none",
            Self::Invalid => "invalid",
            Self::Other(s) => s,
        }
    }
}

/// The correlation payload embedded in each notification.
///
/// Wire keys are `subscription` and `id`; these are a preserved contract
/// with the subscribe call that registered the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationPayload {
    /// Name of the subscription that fired.
    pub subscription: String,
    /// Watcher session identifier the subscription was registered under.
    pub id: String,
}

impl CorrelationPayload {
    /// Create a payload for a subscription in a watcher session.
    pub fn new(subscription: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
            id: id.into(),
        }
    }

    /// Serialize to the JSON string registered with the backend.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One decoded queue notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Where the notification originated.
    pub source: NotificationSource,
    /// Why it fired.
    pub reason: ChangeReason,
    /// Name of the subscription that fired.
    pub subscription: String,
    /// Watcher session identifier carried in the correlation payload.
    pub watcher_id: String,
}

impl Notification {
    /// Decode a notification from the rows of one receive statement.
    ///
    /// Returns `Ok(None)` when the result is empty (queue had no message).
    /// More than one row, a missing or non-string `message_body` column,
    /// or any malformed envelope or payload is a fatal decode error.
    pub fn from_rows(rows: &[Row]) -> Result<Option<Self>, Error> {
        let row = match rows {
            [] => return Ok(None),
            [row] => row,
            more => return Err(Error::MultiRowReceive(more.len())),
        };

        let body = row
            .get(MESSAGE_BODY_COLUMN)
            .and_then(|v| v.as_str())
            .ok_or(Error::MissingMessageBody)?;

        let xml = decode_message_body(body)?;
        let envelope = parse_envelope(&xml)?;
        let payload: CorrelationPayload = serde_json::from_str(&envelope.message)?;

        Ok(Some(Self {
            source: NotificationSource::parse(&envelope.source),
            reason: ChangeReason::parse(&envelope.info),
            subscription: payload.subscription,
            watcher_id: payload.id,
        }))
    }
}
