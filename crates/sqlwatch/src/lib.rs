//! sqlwatch - Watch SQL result-set subscriptions for change notifications.
//!
//! A watch session registers a set of named sql subscriptions with a
//! backend that delivers one-shot change notifications through a message
//! queue, then drives a sequential state machine: drain stale messages,
//! register every subscription, block on the queue, decode and dispatch
//! each notification as an event, and re-register fired subscriptions.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use sqlwatch::{watch, WatchConfig, WatchEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(MyDatabase::connect().await?);
//!
//!     let config = WatchConfig::new("change_queue", "service=notify")
//!         .subscribe("orders", "SELECT id, status FROM dbo.orders")
//!         .with_fetch_results(true);
//!
//!     let mut session = watch(backend, config)?;
//!     while let Some(event) = session.recv().await {
//!         match event {
//!             WatchEvent::Change { subscription, rows, .. } => {
//!                 println!("{} changed: {:?}", subscription, rows);
//!             }
//!             WatchEvent::Timeout { subscription } => {
//!                 println!("{} timed out, re-registering all", subscription);
//!             }
//!             WatchEvent::Error(e) => {
//!                 eprintln!("session failed: {}", e);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod watcher;

pub use backend::{blocking_receive_sql, receive_sql, SubscribableDatabase, SubscribeRequest};
pub use config::WatchConfig;
pub use engine::SubscriptionEngine;
pub use error::Error;
pub use registry::{Subscription, SubscriptionRegistry};
pub use watcher::{watch, WatchEvent, WatchSession};

/// Re-export protocol types.
pub use sqlwatch_proto as proto;
