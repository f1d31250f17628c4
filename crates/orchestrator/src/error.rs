//! Orchestrator error types.

use domain::StageName;
use thiserror::Error;

/// Failure while reading or writing the saga store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend rejected the operation.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Errors that can occur while processing a saga event.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The event names a source stage the topology does not contain.
    #[error("stage {0} is not part of the saga topology")]
    UnknownStage(StageName),

    /// Saga store failure.
    #[error("saga store error: {0}")]
    Store(#[from] StoreError),
}
