//! Saga routing engine.

use std::sync::Arc;

use async_trait::async_trait;
use bus::{MessageBus, MessageHandler, Topics};
use chrono::Utc;
use domain::{Envelope, SagaStatus, StageName};

use crate::error::OrchestratorError;
use crate::store::SagaStore;
use crate::topology::SagaTopology;

/// The central saga state machine.
///
/// Consumes the start topic and the shared outcome inbox. Every
/// decision is a function of the static topology, the incoming event's
/// `(source stage, status)` pair and the stored per-transaction
/// history:
///
/// - no current stage yet: the saga starts and the first stage is
///   commanded (an empty topology finishes successfully right away);
/// - SUCCESS from a stage: the next stage is commanded, or the saga
///   finishes successfully after the last one;
/// - FAIL or ROLLBACK_PENDING from a stage: the saga is marked FAIL and
///   every earlier stage with a SUCCESS history step receives a
///   compensation command, most recent first, followed by the
///   finish-fail and ending notifications.
///
/// Redelivered events are discarded: an event whose `(source, status)`
/// equals the most recent stored history step, or that arrives after
/// the saga already failed, produces no transition and no publish.
pub struct Orchestrator<B, S> {
    bus: B,
    store: S,
    topology: SagaTopology,
    topics: Topics,
}

impl<B, S> Orchestrator<B, S>
where
    B: MessageBus,
    S: SagaStore,
{
    /// Creates an orchestrator over a bus, a saga store and a topology.
    pub fn new(bus: B, store: S, topology: SagaTopology, topics: Topics) -> Self {
        Self {
            bus,
            store,
            topology,
            topics,
        }
    }

    /// The topology this orchestrator routes with.
    pub fn topology(&self) -> &SagaTopology {
        &self.topology
    }

    /// Subscribes the orchestrator to the start topic and the outcome
    /// inbox.
    pub async fn register(self: Arc<Self>)
    where
        B: 'static,
        S: 'static,
    {
        let handler: Arc<dyn MessageHandler> = self.clone();
        self.bus.subscribe(&self.topics.start_saga, Arc::clone(&handler)).await;
        self.bus.subscribe(&self.topics.orchestrator, handler).await;
    }

    /// Processes one saga event and publishes whatever it implies.
    #[tracing::instrument(
        skip(self, envelope),
        fields(
            transaction_id = %envelope.transaction_id,
            source = %envelope.source_stage(),
            status = %envelope.status,
        )
    )]
    pub async fn handle_event(&self, envelope: Envelope) -> Result<(), OrchestratorError> {
        if self.is_duplicate(&envelope).await? {
            metrics::counter!("saga_duplicate_events_total").increment(1);
            tracing::warn!("duplicate saga event discarded");
            return Ok(());
        }

        match envelope.current_stage {
            None => self.start_saga(envelope).await,
            Some(source) if envelope.status.requires_rollback() => {
                self.roll_back(envelope, source).await
            }
            Some(source) => self.advance(envelope, source).await,
        }
    }

    /// An event is a redelivery if its transaction already started and
    /// it carries no source stage, if the stored history already ends
    /// with its `(source, status)` pair, or if the stored saga is
    /// already terminally failed.
    async fn is_duplicate(&self, incoming: &Envelope) -> Result<bool, OrchestratorError> {
        let Some(stored) = self.store.get(&incoming.transaction_id).await? else {
            return Ok(false);
        };
        // A transaction identifies exactly one saga execution; a second
        // start for a known transaction is always a redelivery.
        if incoming.current_stage.is_none() {
            return Ok(true);
        }
        if stored.status == SagaStatus::Fail {
            return Ok(true);
        }
        Ok(stored
            .last_step()
            .is_some_and(|step| step.matches(incoming.source_stage(), incoming.status)))
    }

    async fn start_saga(&self, mut envelope: Envelope) -> Result<(), OrchestratorError> {
        metrics::counter!("saga_executions_total").increment(1);
        envelope.add_history(StageName::Orchestrator, SagaStatus::Success, "Saga started");

        match self.topology.first() {
            Some(first) => {
                envelope.current_stage = Some(first.name());
                self.store.save(envelope.clone()).await?;
                tracing::info!(stage = %first.name(), "saga started");
                self.bus.publish(first.command_topic(), &envelope).await;
                Ok(())
            }
            // No stages configured: the saga is trivially successful.
            None => self.finish_success(envelope, StageName::Orchestrator).await,
        }
    }

    async fn advance(
        &self,
        mut envelope: Envelope,
        source: StageName,
    ) -> Result<(), OrchestratorError> {
        self.topology
            .stage(source)
            .ok_or(OrchestratorError::UnknownStage(source))?;

        match self.topology.next_stage(source) {
            Some(next) => {
                envelope.current_stage = Some(next.name());
                envelope.add_history(
                    source,
                    SagaStatus::Success,
                    format!("Saga continued to {}", next.name()),
                );
                self.store.save(envelope.clone()).await?;
                tracing::info!(from = %source, to = %next.name(), "saga continued");
                self.bus.publish(next.command_topic(), &envelope).await;
                Ok(())
            }
            None => self.finish_success(envelope, source).await,
        }
    }

    async fn finish_success(
        &self,
        mut envelope: Envelope,
        source: StageName,
    ) -> Result<(), OrchestratorError> {
        envelope.status = SagaStatus::Success;
        envelope.add_history(source, SagaStatus::Success, "Saga finished successfully");
        self.store.save(envelope.clone()).await?;

        metrics::counter!("saga_completed").increment(1);
        metrics::histogram!("saga_duration_seconds").record(self.saga_age_seconds(&envelope));
        tracing::info!("saga finished successfully");

        self.bus.publish(&self.topics.finish_success, &envelope).await;
        self.bus.publish(&self.topics.notify_ending, &envelope).await;
        Ok(())
    }

    async fn roll_back(
        &self,
        mut envelope: Envelope,
        source: StageName,
    ) -> Result<(), OrchestratorError> {
        self.topology
            .stage(source)
            .ok_or(OrchestratorError::UnknownStage(source))?;

        let reported = envelope.status;
        envelope.status = SagaStatus::Fail;
        envelope.add_history(
            source,
            reported,
            format!("Saga failed at {source}, rolling back"),
        );

        // Walk backward through the stages that actually completed.
        // Stages never reached must not receive compensation.
        for stage in self.topology.previous_stages(source) {
            if !envelope.has_success_for(stage.name()) {
                continue;
            }
            envelope.add_history(
                stage.name(),
                SagaStatus::Fail,
                format!("Rollback requested for {}", stage.name()),
            );
            tracing::info!(stage = %stage.name(), "publishing compensation command");
            self.bus.publish(stage.rollback_topic(), &envelope).await;
        }

        self.store.save(envelope.clone()).await?;

        metrics::counter!("saga_failed").increment(1);
        metrics::histogram!("saga_duration_seconds").record(self.saga_age_seconds(&envelope));
        tracing::warn!(failed_stage = %source, "saga failed");

        self.bus.publish(&self.topics.finish_fail, &envelope).await;
        self.bus.publish(&self.topics.notify_ending, &envelope).await;
        Ok(())
    }

    fn saga_age_seconds(&self, envelope: &Envelope) -> f64 {
        (Utc::now() - envelope.created_at).num_milliseconds() as f64 / 1000.0
    }
}

#[async_trait]
impl<B, S> MessageHandler for Orchestrator<B, S>
where
    B: MessageBus,
    S: SagaStore,
{
    async fn handle(&self, envelope: Envelope) {
        // The bus is fire-and-forget; a bad event is logged and dropped
        // so the saga it belongs to simply does not transition.
        if let Err(err) = self.handle_event(envelope).await {
            tracing::error!(error = %err, "failed to process saga event; event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySagaStore;
    use bus::{InMemoryBus, RecordingHandler, Topic};
    use common::Money;
    use domain::{Order, OrderProduct, Product};

    struct Recorders {
        validation_command: RecordingHandler,
        payment_command: RecordingHandler,
        inventory_command: RecordingHandler,
        validation_rollback: RecordingHandler,
        payment_rollback: RecordingHandler,
        inventory_rollback: RecordingHandler,
        finish_success: RecordingHandler,
        finish_fail: RecordingHandler,
        notify_ending: RecordingHandler,
    }

    async fn record(bus: &InMemoryBus, topic: &Topic) -> RecordingHandler {
        let recorder = RecordingHandler::new();
        bus.subscribe(topic, Arc::new(recorder.clone())).await;
        recorder
    }

    async fn setup() -> (
        Orchestrator<InMemoryBus, InMemorySagaStore>,
        InMemorySagaStore,
        Recorders,
    ) {
        setup_with_topology(|topics| SagaTopology::standard(topics)).await
    }

    async fn setup_with_topology(
        build: impl Fn(&Topics) -> SagaTopology,
    ) -> (
        Orchestrator<InMemoryBus, InMemorySagaStore>,
        InMemorySagaStore,
        Recorders,
    ) {
        let bus = InMemoryBus::new();
        let topics = Topics::default();
        let store = InMemorySagaStore::new();
        let recorders = Recorders {
            validation_command: record(&bus, &topics.product_validation_success).await,
            payment_command: record(&bus, &topics.payment_success).await,
            inventory_command: record(&bus, &topics.inventory_success).await,
            validation_rollback: record(&bus, &topics.product_validation_fail).await,
            payment_rollback: record(&bus, &topics.payment_fail).await,
            inventory_rollback: record(&bus, &topics.inventory_fail).await,
            finish_success: record(&bus, &topics.finish_success).await,
            finish_fail: record(&bus, &topics.finish_fail).await,
            notify_ending: record(&bus, &topics.notify_ending).await,
        };
        let orchestrator = Orchestrator::new(
            bus.clone(),
            store.clone(),
            build(&topics),
            topics,
        );
        (orchestrator, store, recorders)
    }

    fn new_envelope() -> Envelope {
        Envelope::new(Order::new(vec![OrderProduct::new(
            Product::new("BOOKS", Money::from_cents(1200)),
            2,
        )]))
    }

    /// Simulates what a participant does before reporting an outcome.
    fn outcome(
        mut envelope: Envelope,
        stage: StageName,
        status: SagaStatus,
        message: &str,
    ) -> Envelope {
        envelope.current_stage = Some(stage);
        envelope.status = status;
        envelope.add_history(stage, status, message);
        envelope
    }

    #[tokio::test]
    async fn start_publishes_first_stage_command() {
        let (orchestrator, store, recorders) = setup().await;
        let envelope = new_envelope();

        orchestrator.handle_event(envelope.clone()).await.unwrap();

        let commands = recorders.validation_command.envelopes();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].transaction_id, envelope.transaction_id);
        assert_eq!(commands[0].current_stage, Some(StageName::ProductValidation));

        let stored = store.get(&envelope.transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 1);
        assert!(
            stored.history[0].matches(StageName::Orchestrator, SagaStatus::Success)
        );
        assert!(recorders.payment_command.is_empty());
        assert!(recorders.finish_success.is_empty());
    }

    #[tokio::test]
    async fn empty_topology_finishes_successfully_without_commands() {
        let (orchestrator, store, recorders) =
            setup_with_topology(|_| SagaTopology::new(vec![])).await;
        let envelope = new_envelope();

        orchestrator.handle_event(envelope.clone()).await.unwrap();

        assert!(recorders.validation_command.is_empty());
        assert_eq!(recorders.finish_success.len(), 1);
        assert_eq!(recorders.notify_ending.len(), 1);

        let stored = store.get(&envelope.transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SagaStatus::Success);
    }

    #[tokio::test]
    async fn success_advances_to_next_stage() {
        let (orchestrator, _store, recorders) = setup().await;
        orchestrator.handle_event(new_envelope()).await.unwrap();

        let command = recorders.validation_command.envelopes().remove(0);
        let result = outcome(
            command,
            StageName::ProductValidation,
            SagaStatus::Success,
            "Products validated successfully",
        );
        orchestrator.handle_event(result.clone()).await.unwrap();

        let payment_commands = recorders.payment_command.envelopes();
        assert_eq!(payment_commands.len(), 1);
        assert_eq!(payment_commands[0].transaction_id, result.transaction_id);
        assert_eq!(payment_commands[0].current_stage, Some(StageName::Payment));
        assert!(recorders.inventory_command.is_empty());
    }

    #[tokio::test]
    async fn success_from_last_stage_finishes_the_saga() {
        let (orchestrator, store, recorders) = setup().await;
        orchestrator.handle_event(new_envelope()).await.unwrap();

        let mut current = recorders.validation_command.envelopes().remove(0);
        current = outcome(
            current,
            StageName::ProductValidation,
            SagaStatus::Success,
            "Products validated successfully",
        );
        orchestrator.handle_event(current).await.unwrap();

        current = recorders.payment_command.envelopes().remove(0);
        current = outcome(
            current,
            StageName::Payment,
            SagaStatus::Success,
            "Payment realized successfully",
        );
        orchestrator.handle_event(current).await.unwrap();

        current = recorders.inventory_command.envelopes().remove(0);
        current = outcome(
            current,
            StageName::Inventory,
            SagaStatus::Success,
            "Inventory updated successfully",
        );
        let transaction_id = current.transaction_id.clone();
        orchestrator.handle_event(current).await.unwrap();

        assert_eq!(recorders.finish_success.len(), 1);
        assert_eq!(recorders.notify_ending.len(), 1);
        assert!(recorders.finish_fail.is_empty());

        let stored = store.get(&transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SagaStatus::Success);
        // Each stage contributes its own step plus the routing step,
        // and the sequence never leaves topology order.
        let successes: Vec<StageName> = stored
            .history
            .iter()
            .filter(|step| step.status == SagaStatus::Success)
            .map(|step| step.stage)
            .collect();
        let participant_successes: Vec<StageName> = successes
            .iter()
            .copied()
            .filter(|stage| *stage != StageName::Orchestrator)
            .collect();
        assert_eq!(
            participant_successes,
            vec![
                StageName::ProductValidation,
                StageName::ProductValidation,
                StageName::Payment,
                StageName::Payment,
                StageName::Inventory,
                StageName::Inventory,
            ]
        );
    }

    #[tokio::test]
    async fn failure_compensates_only_completed_stages() {
        let (orchestrator, store, recorders) = setup().await;
        orchestrator.handle_event(new_envelope()).await.unwrap();

        let mut current = recorders.validation_command.envelopes().remove(0);
        current = outcome(
            current,
            StageName::ProductValidation,
            SagaStatus::Success,
            "Products validated successfully",
        );
        orchestrator.handle_event(current).await.unwrap();

        current = recorders.payment_command.envelopes().remove(0);
        current = outcome(
            current,
            StageName::Payment,
            SagaStatus::RollbackPending,
            "Fail to realize payment",
        );
        let transaction_id = current.transaction_id.clone();
        orchestrator.handle_event(current).await.unwrap();

        // Exactly one compensation command, to the validation stage.
        assert_eq!(recorders.validation_rollback.len(), 1);
        assert!(recorders.payment_rollback.is_empty());
        assert!(recorders.inventory_rollback.is_empty());
        assert!(recorders.inventory_command.is_empty());
        assert_eq!(recorders.finish_fail.len(), 1);
        assert_eq!(recorders.notify_ending.len(), 1);
        assert!(recorders.finish_success.is_empty());

        let stored = store.get(&transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SagaStatus::Fail);
        let last = stored.last_step().unwrap();
        assert!(last.matches(StageName::ProductValidation, SagaStatus::Fail));
        assert!(last.message.contains("Rollback requested"));
    }

    #[tokio::test]
    async fn failure_at_first_stage_compensates_nothing() {
        let (orchestrator, store, recorders) = setup().await;
        orchestrator.handle_event(new_envelope()).await.unwrap();

        let command = recorders.validation_command.envelopes().remove(0);
        let result = outcome(
            command,
            StageName::ProductValidation,
            SagaStatus::RollbackPending,
            "Product does not exist",
        );
        let transaction_id = result.transaction_id.clone();
        orchestrator.handle_event(result).await.unwrap();

        assert!(recorders.validation_rollback.is_empty());
        assert!(recorders.payment_rollback.is_empty());
        assert_eq!(recorders.finish_fail.len(), 1);
        assert_eq!(recorders.notify_ending.len(), 1);

        let stored = store.get(&transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.status, SagaStatus::Fail);
    }

    #[tokio::test]
    async fn duplicate_outcome_is_discarded() {
        let (orchestrator, store, recorders) = setup().await;
        orchestrator.handle_event(new_envelope()).await.unwrap();

        let command = recorders.validation_command.envelopes().remove(0);
        let result = outcome(
            command,
            StageName::ProductValidation,
            SagaStatus::Success,
            "Products validated successfully",
        );
        orchestrator.handle_event(result.clone()).await.unwrap();
        let history_len = store
            .get(&result.transaction_id)
            .await
            .unwrap()
            .unwrap()
            .history
            .len();

        // Same (transaction, source, status) delivered again.
        orchestrator.handle_event(result.clone()).await.unwrap();

        assert_eq!(recorders.payment_command.len(), 1);
        let stored = store.get(&result.transaction_id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), history_len);
    }

    #[tokio::test]
    async fn duplicate_start_is_discarded() {
        let (orchestrator, _store, recorders) = setup().await;
        let envelope = new_envelope();

        orchestrator.handle_event(envelope.clone()).await.unwrap();
        orchestrator.handle_event(envelope).await.unwrap();

        assert_eq!(recorders.validation_command.len(), 1);
    }

    #[tokio::test]
    async fn events_after_terminal_failure_are_discarded() {
        let (orchestrator, _store, recorders) = setup().await;
        orchestrator.handle_event(new_envelope()).await.unwrap();

        let command = recorders.validation_command.envelopes().remove(0);
        let failure = outcome(
            command.clone(),
            StageName::ProductValidation,
            SagaStatus::RollbackPending,
            "Product does not exist",
        );
        orchestrator.handle_event(failure.clone()).await.unwrap();
        assert_eq!(recorders.finish_fail.len(), 1);

        // A redelivered failure, and even a stray success, change nothing.
        orchestrator.handle_event(failure).await.unwrap();
        let stray = outcome(
            command,
            StageName::ProductValidation,
            SagaStatus::Success,
            "Products validated successfully",
        );
        orchestrator.handle_event(stray).await.unwrap();

        assert_eq!(recorders.finish_fail.len(), 1);
        assert!(recorders.payment_command.is_empty());
    }

    #[tokio::test]
    async fn unknown_source_stage_is_an_error() {
        let (orchestrator, _store, _recorders) = setup().await;
        let mut envelope = new_envelope();
        envelope.current_stage = Some(StageName::Orchestrator);

        let result = orchestrator.handle_event(envelope).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::UnknownStage(StageName::Orchestrator))
        ));
    }
}
