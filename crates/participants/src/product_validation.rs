//! Product validation participant.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, TransactionId};
use domain::{Envelope, StageName};

use crate::error::ValidationError;
use crate::handler::StageHandler;

#[derive(Debug, Default)]
struct ValidationState {
    validations: HashMap<(OrderId, TransactionId), bool>,
}

/// First saga stage: checks every ordered product against the catalog.
///
/// Keeps one validation record per `(order_id, transaction_id)`; a
/// command for an already-recorded transaction is rejected. The
/// compensating action flips the record to failed, creating a failed
/// record if the forward command never committed one.
#[derive(Debug, Clone)]
pub struct ProductValidationHandler {
    catalog: HashSet<String>,
    state: Arc<RwLock<ValidationState>>,
}

impl ProductValidationHandler {
    /// Creates a handler over a catalog of known product codes.
    pub fn new<I, S>(catalog: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog: catalog.into_iter().map(Into::into).collect(),
            state: Arc::new(RwLock::new(ValidationState::default())),
        }
    }

    /// Number of validation records written so far.
    pub fn validation_count(&self) -> usize {
        self.state.read().unwrap().validations.len()
    }

    /// The recorded outcome for a transaction, if any.
    pub fn validation_succeeded(
        &self,
        order_id: OrderId,
        transaction_id: &TransactionId,
    ) -> Option<bool> {
        self.state
            .read()
            .unwrap()
            .validations
            .get(&(order_id, transaction_id.clone()))
            .copied()
    }

    fn check_products(&self, envelope: &Envelope) -> Result<(), ValidationError> {
        let products = &envelope.payload.products;
        if products.is_empty() {
            return Err(ValidationError::EmptyProductList);
        }
        for line in products {
            if line.product.code.trim().is_empty() {
                return Err(ValidationError::ProductNotInformed);
            }
        }
        for line in products {
            if !self.catalog.contains(&line.product.code) {
                return Err(ValidationError::UnknownProduct(line.product.code.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StageHandler for ProductValidationHandler {
    fn stage(&self) -> StageName {
        StageName::ProductValidation
    }

    async fn execute(&self, envelope: &mut Envelope) -> Result<String, ValidationError> {
        self.check_products(envelope)?;

        let key = (envelope.order_id, envelope.transaction_id.clone());
        let mut state = self.state.write().unwrap();
        if state.validations.contains_key(&key) {
            return Err(ValidationError::DuplicateTransaction(
                envelope.transaction_id.clone(),
            ));
        }
        state.validations.insert(key, true);
        Ok("Products validated successfully".to_string())
    }

    async fn compensate(&self, envelope: &mut Envelope) -> Result<String, ValidationError> {
        let key = (envelope.order_id, envelope.transaction_id.clone());
        self.state.write().unwrap().validations.insert(key, false);
        Ok("Rollback executed on product validation".to_string())
    }
}
