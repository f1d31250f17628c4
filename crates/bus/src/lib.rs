//! Topic-based publish/subscribe abstraction.
//!
//! The saga never talks to a broker directly; everything goes through
//! the [`MessageBus`] trait. Publishing is at-least-once and
//! fire-and-forget: transport failures are logged, never surfaced to
//! the caller. Duplicate delivery is tolerated by idempotency checks in
//! the orchestrator and the participants, not by the adapter.
//!
//! [`InMemoryBus`] is the single-partition reference implementation:
//! one logical worker per deployment draining a FIFO queue, so no two
//! messages are ever handled concurrently and per-transaction ordering
//! is total.

pub mod error;
pub mod memory;
pub mod topic;

use std::sync::Arc;

use async_trait::async_trait;
use domain::Envelope;

pub use error::TransportError;
pub use memory::{InMemoryBus, RecordingHandler};
pub use topic::{Topic, Topics};

/// Callback invoked once per message delivered on a subscribed topic.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one delivered envelope.
    async fn handle(&self, envelope: Envelope);
}

/// Topic-based publish/subscribe bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes an envelope to a topic.
    ///
    /// At-least-once, fire-and-forget: failures are logged by the
    /// implementation and never propagated to the caller.
    async fn publish(&self, topic: &Topic, envelope: &Envelope);

    /// Registers a handler invoked once per message delivered on the
    /// topic. Each subscriber receives its own copy of every message.
    async fn subscribe(&self, topic: &Topic, handler: Arc<dyn MessageHandler>);
}
