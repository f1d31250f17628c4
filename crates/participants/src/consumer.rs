//! Generic consumers binding a stage handler to the bus.

use std::sync::Arc;

use async_trait::async_trait;
use bus::{MessageBus, MessageHandler, Topic};
use domain::{Envelope, SagaStatus};

use crate::handler::StageHandler;

/// Consumes forward commands for one participant.
///
/// This is the single error boundary of a participant: a validation
/// failure becomes a `ROLLBACK_PENDING` outcome, and exactly one
/// outcome is published per processed command either way.
pub struct CommandConsumer<H, B> {
    handler: Arc<H>,
    bus: B,
    outcome_topic: Topic,
}

impl<H, B> CommandConsumer<H, B> {
    /// Creates a command consumer publishing outcomes to the given topic.
    pub fn new(handler: Arc<H>, bus: B, outcome_topic: Topic) -> Self {
        Self {
            handler,
            bus,
            outcome_topic,
        }
    }
}

#[async_trait]
impl<H, B> MessageHandler for CommandConsumer<H, B>
where
    H: StageHandler,
    B: MessageBus,
{
    async fn handle(&self, mut envelope: Envelope) {
        let stage = self.handler.stage();
        envelope.current_stage = Some(stage);

        match self.handler.execute(&mut envelope).await {
            Ok(message) => {
                envelope.status = SagaStatus::Success;
                envelope.add_history(stage, SagaStatus::Success, message);
                tracing::info!(%stage, transaction_id = %envelope.transaction_id, "stage executed");
            }
            Err(err) => {
                envelope.status = SagaStatus::RollbackPending;
                envelope.add_history(stage, SagaStatus::RollbackPending, err.to_string());
                tracing::error!(
                    %stage,
                    transaction_id = %envelope.transaction_id,
                    error = %err,
                    "stage execution failed"
                );
            }
        }

        self.bus.publish(&self.outcome_topic, &envelope).await;
    }
}

/// Consumes compensation commands for one participant.
///
/// Compensation is terminal for the participant: the history step is
/// appended to the delivered copy and no outcome is published.
pub struct RollbackConsumer<H> {
    handler: Arc<H>,
}

impl<H> RollbackConsumer<H> {
    /// Creates a rollback consumer.
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<H> MessageHandler for RollbackConsumer<H>
where
    H: StageHandler,
{
    async fn handle(&self, mut envelope: Envelope) {
        let stage = self.handler.stage();
        envelope.current_stage = Some(stage);

        match self.handler.compensate(&mut envelope).await {
            Ok(message) => {
                envelope.add_history(stage, SagaStatus::Fail, message);
                tracing::info!(%stage, transaction_id = %envelope.transaction_id, "stage rolled back");
            }
            Err(err) => {
                envelope.add_history(
                    stage,
                    SagaStatus::Fail,
                    format!("Rollback not executed: {err}"),
                );
                tracing::error!(
                    %stage,
                    transaction_id = %envelope.transaction_id,
                    error = %err,
                    "stage rollback failed"
                );
            }
        }
    }
}

/// Subscribes a participant to its command and rollback topics.
pub async fn register_participant<H, B>(
    bus: &B,
    handler: Arc<H>,
    command_topic: &Topic,
    rollback_topic: &Topic,
    outcome_topic: &Topic,
) where
    H: StageHandler + 'static,
    B: MessageBus + Clone + 'static,
{
    bus.subscribe(
        command_topic,
        Arc::new(CommandConsumer::new(
            Arc::clone(&handler),
            bus.clone(),
            outcome_topic.clone(),
        )),
    )
    .await;
    bus.subscribe(rollback_topic, Arc::new(RollbackConsumer::new(handler)))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus::{InMemoryBus, RecordingHandler};
    use common::Money;
    use domain::{Order, OrderProduct, Product, StageName};

    use crate::error::ValidationError;

    struct StubHandler {
        fail: bool,
    }

    #[async_trait]
    impl StageHandler for StubHandler {
        fn stage(&self) -> StageName {
            StageName::Payment
        }

        async fn execute(&self, _envelope: &mut Envelope) -> Result<String, ValidationError> {
            if self.fail {
                Err(ValidationError::EmptyProductList)
            } else {
                Ok("Payment realized successfully".to_string())
            }
        }

        async fn compensate(&self, _envelope: &mut Envelope) -> Result<String, ValidationError> {
            Ok("Rollback executed for payment".to_string())
        }
    }

    fn sample_envelope() -> Envelope {
        Envelope::new(Order::new(vec![OrderProduct::new(
            Product::new("BOOKS", Money::from_cents(900)),
            1,
        )]))
    }

    async fn setup(fail: bool) -> (InMemoryBus, RecordingHandler, Topic, Topic) {
        let bus = InMemoryBus::new();
        let command_topic = Topic::from("payment-success");
        let rollback_topic = Topic::from("payment-fail");
        let outcome_topic = Topic::from("base-orchestrator");

        register_participant(
            &bus,
            Arc::new(StubHandler { fail }),
            &command_topic,
            &rollback_topic,
            &outcome_topic,
        )
        .await;

        let outcomes = RecordingHandler::new();
        bus.subscribe(&outcome_topic, Arc::new(outcomes.clone())).await;

        (bus, outcomes, command_topic, rollback_topic)
    }

    #[tokio::test]
    async fn command_success_publishes_one_success_outcome() {
        let (bus, outcomes, command_topic, _) = setup(false).await;

        bus.publish(&command_topic, &sample_envelope()).await;

        let received = outcomes.envelopes();
        assert_eq!(received.len(), 1);
        let outcome = &received[0];
        assert_eq!(outcome.current_stage, Some(StageName::Payment));
        assert_eq!(outcome.status, SagaStatus::Success);
        let last = outcome.last_step().unwrap();
        assert!(last.matches(StageName::Payment, SagaStatus::Success));
        assert_eq!(last.message, "Payment realized successfully");
    }

    #[tokio::test]
    async fn command_failure_publishes_one_rollback_pending_outcome() {
        let (bus, outcomes, command_topic, _) = setup(true).await;

        bus.publish(&command_topic, &sample_envelope()).await;

        let received = outcomes.envelopes();
        assert_eq!(received.len(), 1);
        let outcome = &received[0];
        assert_eq!(outcome.status, SagaStatus::RollbackPending);
        let last = outcome.last_step().unwrap();
        assert!(last.matches(StageName::Payment, SagaStatus::RollbackPending));
        assert_eq!(last.message, "product list is empty");
    }

    #[tokio::test]
    async fn rollback_command_publishes_nothing() {
        let (bus, outcomes, _, rollback_topic) = setup(false).await;

        let mut envelope = sample_envelope();
        envelope.status = SagaStatus::Fail;
        bus.publish(&rollback_topic, &envelope).await;

        assert!(outcomes.is_empty());
    }
}
