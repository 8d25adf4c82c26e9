//! The watch-loop state machine and the session handle it runs behind.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use sqlwatch_proto::{ChangeReason, Notification, NotificationSource, QueryResult};

use crate::backend::{blocking_receive_sql, SubscribableDatabase};
use crate::config::WatchConfig;
use crate::engine::SubscriptionEngine;
use crate::error::Error;
use crate::registry::SubscriptionRegistry;

/// An event observed by a watch session.
#[derive(Debug)]
pub enum WatchEvent {
    /// A watched result set changed.
    Change {
        /// Name of the subscription that fired.
        subscription: String,
        /// Fresh results for the subscription's sql, when result fetching
        /// is enabled; `None` otherwise.
        rows: Option<QueryResult>,
        /// Notification source, as delivered by the backend.
        source: NotificationSource,
        /// Change reason, as delivered by the backend.
        reason: ChangeReason,
    },
    /// The backend-side subscription timeout elapsed.
    Timeout {
        /// Name carried by the timeout notification.
        subscription: String,
    },
    /// The session hit an unrecoverable error. Always the last event.
    Error(Error),
}

/// Watch-loop states.
///
/// There is no success terminal: the loop runs until an unrecoverable
/// error, or until the caller drops the session and the event channel
/// closes under it.
#[derive(Debug)]
enum WatchState {
    /// Discarding stale messages left over from a previous session.
    Draining,
    /// Registering every subscription.
    RegisteringAll,
    /// Blocked on the queue, waiting for a notification.
    Waiting,
    /// Renewing the one subscription that just fired.
    RegisteringOne(String),
    /// Unrecoverable error emitted; no further queue operations.
    Terminated,
}

/// A running watch session.
///
/// The session's worker task is spawned before this handle is returned,
/// but every event it emits is buffered on the channel, so a caller that
/// receives after spawning still sees the full event sequence. Dropping
/// the session closes the channel; a blocking receive already in flight
/// at the backend is not cancelled (known resource-leak risk absent a
/// backend-level cancel hook).
#[derive(Debug)]
pub struct WatchSession {
    events: mpsc::UnboundedReceiver<WatchEvent>,
    handle: JoinHandle<()>,
    watcher_id: String,
}

impl WatchSession {
    /// Receive the next event, or `None` once the session has terminated
    /// and all buffered events were consumed.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// The session identifier carried in every correlation payload.
    pub fn watcher_id(&self) -> &str {
        &self.watcher_id
    }

    /// Whether the worker task has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Abort the worker task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Start watching the configured subscriptions.
///
/// Validates the configuration and builds the registry synchronously, then
/// spawns the watch loop. Events arrive on the returned session handle.
pub fn watch<B>(backend: Arc<B>, config: WatchConfig) -> Result<WatchSession, Error>
where
    B: SubscribableDatabase + 'static,
{
    config.validate()?;

    let watcher_id = uuid::Uuid::new_v4().to_string();
    let registry = SubscriptionRegistry::from_config(&config, watcher_id.clone())?;

    let (tx, rx) = mpsc::unbounded_channel();
    let worker = Watcher {
        engine: SubscriptionEngine::new(backend.clone(), config.queue.clone()),
        backend,
        registry,
        queue: config.queue,
        fetch_results: config.fetch_results,
        events: tx,
    };
    let handle = tokio::spawn(worker.run());

    Ok(WatchSession {
        events: rx,
        handle,
        watcher_id,
    })
}

/// The worker side of a watch session.
struct Watcher<B> {
    backend: Arc<B>,
    engine: SubscriptionEngine<B>,
    registry: SubscriptionRegistry,
    queue: String,
    fetch_results: bool,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl<B: SubscribableDatabase> Watcher<B> {
    /// Drive the state machine until termination.
    async fn run(self) {
        info!(
            watcher_id = %self.registry.watcher_id(),
            queue = %self.queue,
            subscriptions = self.registry.len(),
            "watch session started"
        );

        let mut state = WatchState::Draining;
        loop {
            state = match state {
                WatchState::Draining => match self.engine.drain_queue().await {
                    Ok(()) => WatchState::RegisteringAll,
                    Err(e) => self.fail(e),
                },
                WatchState::RegisteringAll => {
                    match self.engine.register_all(&self.registry).await {
                        Ok(()) => WatchState::Waiting,
                        Err(e) => self.fail(e),
                    }
                }
                WatchState::RegisteringOne(name) => match self.registry.lookup(&name) {
                    Some(sub) => match self.engine.register_one(sub).await {
                        Ok(()) => WatchState::Waiting,
                        Err(e) => self.fail(e),
                    },
                    None => self.fail(Error::UnknownSubscription(name)),
                },
                WatchState::Waiting => self.wait_once().await,
                WatchState::Terminated => break,
            };
        }

        info!(watcher_id = %self.registry.watcher_id(), "watch session terminated");
    }

    /// One blocking-receive cycle.
    async fn wait_once(&self) -> WatchState {
        let sql = blocking_receive_sql(&self.queue);
        let rows = match self.backend.query(&sql).await {
            Ok(rows) => rows,
            Err(e) => return self.fail(e),
        };

        let notification = match Notification::from_rows(&rows) {
            Ok(n) => n,
            Err(e) => return self.fail(e.into()),
        };
        let notification = match notification {
            Some(n) => n,
            // Server-side wait expired with no message; keep waiting.
            None => return WatchState::Waiting,
        };

        // The queue is shared infrastructure: traffic for sibling watchers
        // is expected and must not advance this session's state.
        if notification.watcher_id != self.registry.watcher_id() {
            debug!(
                subscription = %notification.subscription,
                watcher_id = %notification.watcher_id,
                "ignoring foreign notification"
            );
            return WatchState::Waiting;
        }

        self.dispatch(notification).await
    }

    /// Interpret one notification addressed to this session.
    async fn dispatch(&self, notification: Notification) -> WatchState {
        use ChangeReason as Reason;
        use NotificationSource as Source;

        match (&notification.source, &notification.reason) {
            // A backend-side timeout invalidates every active subscription,
            // so all of them are re-registered, not just the named one.
            (Source::Timeout, Reason::None) => {
                self.emit(WatchEvent::Timeout {
                    subscription: notification.subscription,
                });
                WatchState::RegisteringAll
            }

            (Source::Data, Reason::Insert | Reason::Update | Reason::Delete) => {
                let sub = match self.registry.lookup(&notification.subscription) {
                    Some(sub) => sub,
                    None => {
                        return self.fail(Error::UnknownSubscription(notification.subscription))
                    }
                };

                let rows = if self.fetch_results {
                    match self.backend.query(&sub.sql).await {
                        Ok(rows) => Some(rows),
                        Err(e) => return self.fail(e),
                    }
                } else {
                    None
                };

                self.emit(WatchEvent::Change {
                    subscription: notification.subscription.clone(),
                    rows,
                    source: notification.source.clone(),
                    reason: notification.reason.clone(),
                });

                // Notifications are one-shot; the fired subscription must
                // be renewed before further changes to it are observed.
                WatchState::RegisteringOne(notification.subscription)
            }

            (Source::Statement, Reason::Invalid) => {
                match self.registry.lookup(&notification.subscription) {
                    Some(sub) => self.fail(Error::InvalidStatement {
                        subscription: sub.name.clone(),
                        sql: sub.sql.clone(),
                    }),
                    None => self.fail(Error::UnknownSubscription(notification.subscription)),
                }
            }

            (source, reason) => self.fail(Error::UnknownNotification {
                source: source.as_str().to_string(),
                reason: reason.as_str().to_string(),
                subscription: notification.subscription.clone(),
            }),
        }
    }

    /// Emit a fatal error event and terminate.
    fn fail(&self, error: Error) -> WatchState {
        tracing::error!(error = %error, "watch session failed");
        self.emit(WatchEvent::Error(error));
        WatchState::Terminated
    }

    fn emit(&self, event: WatchEvent) {
        // A closed channel means the caller dropped the session; the loop
        // still winds down through Terminated on the next fatal condition,
        // and events for a gone caller are simply dropped.
        let _ = self.events.send(event);
    }
}
