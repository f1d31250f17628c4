//! Append-only saga history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::StageName;
use crate::status::SagaStatus;

/// One record in the saga history.
///
/// Steps are immutable once appended; they are never edited or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// The stage that produced this record.
    pub stage: StageName,
    /// Outcome reported by that stage.
    pub status: SagaStatus,
    /// Human-readable description of what happened.
    pub message: String,
    /// When the record was appended.
    pub timestamp: DateTime<Utc>,
}

impl Step {
    /// Creates a step stamped with the current time.
    pub fn new(stage: StageName, status: SagaStatus, message: impl Into<String>) -> Self {
        Self {
            stage,
            status,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Returns true if this step records the given source and outcome.
    pub fn matches(&self, stage: StageName, status: SagaStatus) -> bool {
        self.stage == stage && self.status == status
    }
}
