//! Per-transaction envelope persistence.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, TransactionId};
use domain::Envelope;
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Persistence for the authoritative envelope of each saga execution.
///
/// The orchestrator keeps exactly one envelope per transaction and
/// derives every routing decision (including the duplicate guard) from
/// its stored history. Participant domain state never lives here.
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Loads the envelope for a transaction, if the saga is known.
    async fn get(&self, transaction_id: &TransactionId) -> Result<Option<Envelope>, StoreError>;

    /// Saves (or replaces) the envelope for its transaction.
    async fn save(&self, envelope: Envelope) -> Result<(), StoreError>;

    /// All envelopes belonging to an order, oldest first.
    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<Envelope>, StoreError>;
}

/// In-memory saga store.
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    envelopes: Arc<RwLock<HashMap<TransactionId, Envelope>>>,
}

impl InMemorySagaStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sagas the store knows about.
    pub async fn saga_count(&self) -> usize {
        self.envelopes.read().await.len()
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn get(&self, transaction_id: &TransactionId) -> Result<Option<Envelope>, StoreError> {
        Ok(self.envelopes.read().await.get(transaction_id).cloned())
    }

    async fn save(&self, envelope: Envelope) -> Result<(), StoreError> {
        self.envelopes
            .write()
            .await
            .insert(envelope.transaction_id.clone(), envelope);
        Ok(())
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<Envelope>, StoreError> {
        let envelopes = self.envelopes.read().await;
        let mut matching: Vec<Envelope> = envelopes
            .values()
            .filter(|envelope| envelope.order_id == order_id)
            .cloned()
            .collect();
        matching.sort_by_key(|envelope| envelope.created_at);
        Ok(matching)
    }
}
