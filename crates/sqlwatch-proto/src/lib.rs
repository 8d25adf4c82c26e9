//! Query notification wire protocol for sqlwatch.
//!
//! This crate defines the decode path from a raw queue message to a typed
//! [`Notification`], plus the row/value model carried in change events.
//!
//! # Modules
//!
//! - [`value`] - Row and value types for query results
//! - [`envelope`] - Transport decoding (hex + UTF-16LE) and envelope parsing
//! - [`notification`] - Typed notifications and the row-set decoder
//! - [`error`] - Protocol error types
//!
//! # Decoding
//!
//! ```ignore
//! use sqlwatch_proto::Notification;
//!
//! // rows: the result of one RECEIVE statement
//! match Notification::from_rows(&rows)? {
//!     None => println!("queue empty"),
//!     Some(n) => println!("{} fired: {:?}/{:?}", n.subscription, n.source, n.reason),
//! }
//! ```

pub mod envelope;
pub mod error;
pub mod notification;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use envelope::{decode_message_body, encode_message_body, parse_envelope, Envelope};
pub use notification::{
    ChangeReason, CorrelationPayload, Notification, NotificationSource, MESSAGE_BODY_COLUMN,
};
pub use value::{QueryResult, Row, Value};
