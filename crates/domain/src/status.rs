//! Saga status carried on the envelope and on history steps.

use serde::{Deserialize, Serialize};

/// Outcome status of a saga or of a single stage execution.
///
/// `SUCCESS` and `FAIL` are the two terminal saga statuses; a stage that
/// fails its domain action reports `ROLLBACK_PENDING`, which the
/// orchestrator converts into the terminal `FAIL` while it unwinds the
/// completed stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStatus {
    /// Stage (or whole saga) completed successfully.
    #[default]
    Success,

    /// A stage failed and compensation has not started yet.
    RollbackPending,

    /// The saga failed and compensation was issued (terminal).
    Fail,
}

impl SagaStatus {
    /// Returns true if this status triggers the rollback path.
    pub fn requires_rollback(&self) -> bool {
        matches!(self, SagaStatus::RollbackPending | SagaStatus::Fail)
    }

    /// Returns the status name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Success => "SUCCESS",
            SagaStatus::RollbackPending => "ROLLBACK_PENDING",
            SagaStatus::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
