//! Central saga orchestration engine.
//!
//! The orchestrator consumes every outcome event, resolves the next
//! action from the static [`SagaTopology`] and the per-transaction
//! history, and publishes the resulting command: forward to the next
//! stage on success, compensation commands backward through the stages
//! that actually completed on failure, and finish/notification events
//! once a terminal status is reached.
//!
//! The engine assumes all events of one transaction arrive in
//! completion order (one partition per topic) and performs no
//! reordering. There is deliberately no timeout or dead-letter
//! handling: a saga whose participant never answers stays pending.

pub mod engine;
pub mod error;
pub mod store;
pub mod topology;

pub use engine::Orchestrator;
pub use error::{OrchestratorError, StoreError};
pub use store::{InMemorySagaStore, SagaStore};
pub use topology::{SagaTopology, Stage};
