//! Payment participant.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId, TransactionId};
use domain::{Envelope, StageName};

use crate::error::ValidationError;
use crate::handler::StageHandler;

/// Default floor for an order total, in cents.
const DEFAULT_MINIMUM_CENTS: i64 = 10;

/// Lifecycle of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Recorded but not yet captured.
    Pending,
    /// Captured successfully.
    Success,
    /// Returned to the customer during compensation.
    Refunded,
}

/// A payment kept in the participant's private store.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    /// Order the payment belongs to.
    pub order_id: OrderId,
    /// Saga execution that produced it.
    pub transaction_id: TransactionId,
    /// Captured amount.
    pub total_amount: Money,
    /// Number of items paid for.
    pub total_items: u32,
    /// Current lifecycle status.
    pub status: PaymentStatus,
}

#[derive(Debug, Default)]
struct PaymentState {
    payments: HashMap<(OrderId, TransactionId), PaymentRecord>,
}

/// Second saga stage: charges the order total.
///
/// Records a pending payment, computes the payload aggregates
/// (`total_amount`, `total_items`) and writes them back into the
/// envelope, then captures the payment if the total clears the
/// configured minimum. Compensation refunds a captured payment and is
/// an idempotent no-op for an already-refunded one.
#[derive(Debug, Clone)]
pub struct PaymentHandler {
    minimum_amount: Money,
    state: Arc<RwLock<PaymentState>>,
}

impl PaymentHandler {
    /// Creates a handler with the default minimum order amount.
    pub fn new() -> Self {
        Self::with_minimum(Money::from_cents(DEFAULT_MINIMUM_CENTS))
    }

    /// Creates a handler with an explicit minimum order amount.
    pub fn with_minimum(minimum_amount: Money) -> Self {
        Self {
            minimum_amount,
            state: Arc::new(RwLock::new(PaymentState::default())),
        }
    }

    /// Number of payment records written so far.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }

    /// The payment record for a transaction, if any.
    pub fn payment(
        &self,
        order_id: OrderId,
        transaction_id: &TransactionId,
    ) -> Option<PaymentRecord> {
        self.state
            .read()
            .unwrap()
            .payments
            .get(&(order_id, transaction_id.clone()))
            .cloned()
    }
}

impl Default for PaymentHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StageHandler for PaymentHandler {
    fn stage(&self) -> StageName {
        StageName::Payment
    }

    async fn execute(&self, envelope: &mut Envelope) -> Result<String, ValidationError> {
        let key = (envelope.order_id, envelope.transaction_id.clone());
        let total_amount = envelope.payload.amount_due();
        let total_items = envelope.payload.item_count();

        {
            let mut state = self.state.write().unwrap();
            if state.payments.contains_key(&key) {
                return Err(ValidationError::DuplicateTransaction(
                    envelope.transaction_id.clone(),
                ));
            }
            state.payments.insert(
                key.clone(),
                PaymentRecord {
                    order_id: envelope.order_id,
                    transaction_id: envelope.transaction_id.clone(),
                    total_amount,
                    total_items,
                    status: PaymentStatus::Pending,
                },
            );
        }

        envelope.payload.total_amount = total_amount;
        envelope.payload.total_items = total_items;

        if total_amount < self.minimum_amount {
            // The pending record stays behind; the saga fails here, so
            // this stage is never compensated.
            return Err(ValidationError::AmountBelowMinimum {
                amount: total_amount,
                minimum: self.minimum_amount,
            });
        }

        let mut state = self.state.write().unwrap();
        if let Some(payment) = state.payments.get_mut(&key) {
            payment.status = PaymentStatus::Success;
        }
        Ok("Payment realized successfully".to_string())
    }

    async fn compensate(&self, envelope: &mut Envelope) -> Result<String, ValidationError> {
        let key = (envelope.order_id, envelope.transaction_id.clone());
        let mut state = self.state.write().unwrap();

        let Some(payment) = state.payments.get_mut(&key) else {
            return Err(ValidationError::RecordNotFound {
                entity: "payment",
                order_id: envelope.order_id,
            });
        };
        if payment.status == PaymentStatus::Refunded {
            return Ok("Payment already refunded".to_string());
        }

        payment.status = PaymentStatus::Refunded;
        envelope.payload.total_amount = payment.total_amount;
        envelope.payload.total_items = payment.total_items;
        Ok("Rollback executed for payment".to_string())
    }
}
