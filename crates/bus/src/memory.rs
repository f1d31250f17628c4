//! In-memory single-partition bus implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::Envelope;

use crate::error::TransportError;
use crate::topic::Topic;
use crate::{MessageBus, MessageHandler};

#[derive(Default)]
struct BusState {
    handlers: HashMap<Topic, Vec<Arc<dyn MessageHandler>>>,
    queue: VecDeque<(Topic, String)>,
    dispatching: bool,
}

/// In-memory message bus with one partition per topic.
///
/// Every published message is JSON-encoded into a single FIFO queue
/// that is drained to completion before the outermost `publish` call
/// returns. No two messages are ever handled concurrently, which makes
/// per-transaction ordering total without any locking in the handlers.
/// Increasing parallelism here without partitioning by transaction
/// would break the ordering the orchestrator relies on.
///
/// Messages that fail to deserialize are dropped with a warning, as are
/// messages published to a topic nobody subscribed to.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    state: Arc<Mutex<BusState>>,
}

impl InMemoryBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a raw payload on a topic, bypassing envelope encoding.
    ///
    /// Lets tests and external producers exercise the malformed-message
    /// path; normal callers go through [`MessageBus::publish`].
    pub async fn publish_raw(&self, topic: &Topic, payload: impl Into<String>) {
        self.enqueue(topic.clone(), payload.into());
        self.drain().await;
    }

    fn enqueue(&self, topic: Topic, payload: String) {
        let mut state = self.state.lock().unwrap();
        state.queue.push_back((topic, payload));
    }

    /// Drains the dispatch queue unless another caller already is.
    async fn drain(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }

        loop {
            let next = {
                let mut state = self.state.lock().unwrap();
                match state.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        state.dispatching = false;
                        return;
                    }
                }
            };
            let (topic, payload) = next;

            let handlers = {
                let state = self.state.lock().unwrap();
                state.handlers.get(&topic).cloned().unwrap_or_default()
            };
            if handlers.is_empty() {
                let err = TransportError::NoSubscriber(topic);
                tracing::debug!(error = %err, "dropping message");
                continue;
            }

            match serde_json::from_str::<Envelope>(&payload) {
                Ok(envelope) => {
                    for handler in &handlers {
                        handler.handle(envelope.clone()).await;
                    }
                }
                Err(err) => {
                    let err = TransportError::from(err);
                    tracing::warn!(%topic, error = %err, "dropping undeserializable message");
                }
            }
        }
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &Topic, envelope: &Envelope) {
        match serde_json::to_string(envelope) {
            Ok(payload) => {
                tracing::debug!(%topic, transaction_id = %envelope.transaction_id, "publishing event");
                self.enqueue(topic.clone(), payload);
                self.drain().await;
            }
            Err(err) => {
                let err = TransportError::from(err);
                tracing::error!(%topic, error = %err, "failed to publish event");
            }
        }
    }

    async fn subscribe(&self, topic: &Topic, handler: Arc<dyn MessageHandler>) {
        let mut state = self.state.lock().unwrap();
        state.handlers.entry(topic.clone()).or_default().push(handler);
    }
}

/// Handler that records every envelope it receives.
///
/// Test double for asserting what was published on a topic.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    received: Arc<Mutex<Vec<Envelope>>>,
}

impl RecordingHandler {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything received so far, in delivery order.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.received.lock().unwrap().clone()
    }

    /// Number of messages received so far.
    pub fn len(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Returns true if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, envelope: Envelope) {
        self.received.lock().unwrap().push(envelope);
    }
}
