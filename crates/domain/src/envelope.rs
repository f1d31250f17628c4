//! The saga event envelope.

use chrono::{DateTime, Utc};
use common::{OrderId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::history::Step;
use crate::order::Order;
use crate::stage::StageName;
use crate::status::SagaStatus;

/// The message exchanged between the orchestrator and the participants.
///
/// An envelope is created once at ingress and then mutated only by
/// appending history and updating `status`, `current_stage` and the
/// payload aggregates, always by the single stage that owns it at that
/// moment. Once a terminal status is recorded and the ending
/// notification is emitted, the envelope is never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The order being fulfilled.
    pub order_id: OrderId,
    /// The saga execution key.
    pub transaction_id: TransactionId,
    /// Stage that last owned the envelope; `None` until the
    /// orchestrator starts the saga. For an emitted event this doubles
    /// as the source stage.
    pub current_stage: Option<StageName>,
    /// Saga status as of the last transition.
    pub status: SagaStatus,
    /// Order data plus computed aggregates.
    pub payload: Order,
    /// Append-only record of everything that happened to this saga.
    pub history: Vec<Step>,
    /// When the envelope was created at ingress.
    pub created_at: DateTime<Utc>,
}

impl Envelope {
    /// Creates the initial envelope for a new order.
    pub fn new(payload: Order) -> Self {
        Self {
            order_id: payload.id,
            transaction_id: payload.transaction_id.clone(),
            current_stage: None,
            status: SagaStatus::Success,
            history: Vec::new(),
            created_at: Utc::now(),
            payload,
        }
    }

    /// The stage that emitted this event; the orchestrator for an
    /// envelope that has not entered the pipeline yet.
    pub fn source_stage(&self) -> StageName {
        self.current_stage.unwrap_or(StageName::Orchestrator)
    }

    /// Appends a history step stamped with the current time.
    pub fn add_history(
        &mut self,
        stage: StageName,
        status: SagaStatus,
        message: impl Into<String>,
    ) {
        self.history.push(Step::new(stage, status, message));
    }

    /// The most recently appended history step.
    pub fn last_step(&self) -> Option<&Step> {
        self.history.last()
    }

    /// Returns true if the history records a successful execution of
    /// the given stage. Used to decide which stages receive
    /// compensation commands.
    pub fn has_success_for(&self, stage: StageName) -> bool {
        self.history
            .iter()
            .any(|step| step.matches(stage, SagaStatus::Success))
    }
}
