//! The participant contract.

use async_trait::async_trait;
use domain::{Envelope, StageName};

use crate::error::ValidationError;

/// One participant's unit of work in the saga.
///
/// Implementations mutate only their private store and the envelope
/// they were handed (payload aggregates); the surrounding consumers own
/// status transitions, history protocol entries and all publishing.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// The stage this participant implements.
    fn stage(&self) -> StageName;

    /// Performs the domain action for a forward command, keyed by
    /// `(order_id, transaction_id)`. A second command for an
    /// already-seen transaction must fail validation. Returns the
    /// history message describing what was done.
    async fn execute(&self, envelope: &mut Envelope) -> Result<String, ValidationError>;

    /// Performs the compensating action for a rollback command. Must be
    /// an idempotent no-op when no prior committed success record
    /// exists for the transaction. Returns the history message.
    async fn compensate(&self, envelope: &mut Envelope) -> Result<String, ValidationError>;
}
