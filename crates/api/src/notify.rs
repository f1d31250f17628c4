//! Terminal saga notification consumer.

use async_trait::async_trait;
use bus::MessageHandler;
use domain::Envelope;

/// Logs every saga that reaches a terminal state.
///
/// Subscribed to the ending notification topic; a real deployment
/// would hand the envelope to whatever cares about finished orders.
pub struct SagaEndingLogger;

#[async_trait]
impl MessageHandler for SagaEndingLogger {
    async fn handle(&self, envelope: Envelope) {
        tracing::info!(
            transaction_id = %envelope.transaction_id,
            order_id = %envelope.order_id,
            status = %envelope.status,
            steps = envelope.history.len(),
            "saga reached a terminal state"
        );
    }
}
