//! Spool event system for decoupled downstream integration.
//!
//! When an artifact lands in the spool, downstream consumers (local
//! mail processors, indexers) may want to know without polling the
//! directory tree. Events are dispatched fire-and-forget after the
//! durable write completes; the success response to the relay never
//! depends on any subscriber.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpoolEvent {
    /// A notification was durably written to the spool.
    ArtifactStored(ArtifactStoredEvent),
}

/// Event emitted when a notification has been durably spooled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactStoredEvent {
    /// Stream the artifact was spooled under.
    pub stream: String,

    /// Artifact file name within the stream directory.
    pub artifact: String,

    /// Identity that posted the notification.
    pub identity: String,

    /// Content fingerprint of the payload (8 hex characters).
    pub fingerprint: String,

    /// Size of the serialized payload in bytes.
    pub payload_size: usize,

    /// When the artifact was stored.
    pub stored_at: DateTime<Utc>,
}

/// Trait for reacting to spool events.
///
/// Handlers must not block ingestion: the pipeline spawns dispatch
/// onto a separate task, and a handler that fails should log and
/// swallow its own errors.
#[async_trait::async_trait]
pub trait SpoolEventHandler: Send + Sync + std::fmt::Debug {
    /// Handles one spool event.
    async fn handle_event(&self, event: SpoolEvent);
}

/// Handler that discards all events.
#[derive(Debug, Default)]
pub struct NoOpEventHandler;

impl NoOpEventHandler {
    /// Creates a new no-op handler.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SpoolEventHandler for NoOpEventHandler {
    async fn handle_event(&self, _event: SpoolEvent) {}
}

/// Forwards events to every registered subscriber concurrently.
///
/// The production binary wires an empty multicast handler as the hook
/// point for downstream processes; subscribers are added without the
/// ingestion path knowing about them.
#[derive(Debug, Clone, Default)]
pub struct MulticastEventHandler {
    handlers: Vec<Arc<dyn SpoolEventHandler>>,
}

impl MulticastEventHandler {
    /// Creates a multicast handler with no subscribers.
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Adds a subscriber.
    pub fn add_subscriber(&mut self, handler: Arc<dyn SpoolEventHandler>) {
        self.handlers.push(handler);
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait::async_trait]
impl SpoolEventHandler for MulticastEventHandler {
    async fn handle_event(&self, event: SpoolEvent) {
        let futures = self.handlers.iter().map(|handler| {
            let event = event.clone();
            async move {
                handler.handle_event(event).await;
            }
        });

        // Subscriber outcomes never feed back into ingestion.
        futures::future::join_all(futures).await;
    }
}
