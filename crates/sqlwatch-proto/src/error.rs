//! Protocol error types.

use thiserror::Error;

/// Notification decoding errors.
///
/// Every variant here is fatal to a watch session: the receive contract
/// guarantees well-formed single-message results, so a malformed payload
/// means the queue is broken or shared with an incompatible producer.
#[derive(Debug, Error)]
pub enum Error {
    /// The receive statement returned more than one row.
    #[error("multi-row receive result: expected 0 or 1 rows, got {0}")]
    MultiRowReceive(usize),

    /// The received row has no `message_body` column.
    #[error("receive result does not contain a message body")]
    MissingMessageBody,

    /// The message body could not be decoded from its transport encoding.
    #[error("transport decode error: {0}")]
    Transport(String),

    /// The notification envelope is malformed.
    #[error("invalid notification envelope: {0}")]
    InvalidEnvelope(String),

    /// The embedded correlation payload is not valid JSON.
    #[error("invalid correlation payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}
