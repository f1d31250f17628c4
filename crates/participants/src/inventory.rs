//! Inventory participant.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, TransactionId};
use domain::{Envelope, StageName};

use crate::error::ValidationError;
use crate::handler::StageHandler;

/// Ledger entry recording one stock movement made for an order.
#[derive(Debug, Clone)]
pub struct OrderInventory {
    /// Product whose stock moved.
    pub product_code: String,
    /// Quantity the order consumed.
    pub order_quantity: u32,
    /// Stock level before the movement.
    pub old_quantity: u32,
    /// Stock level after the movement.
    pub new_quantity: u32,
}

#[derive(Debug, Default)]
struct InventoryState {
    stock: HashMap<String, u32>,
    movements: HashMap<(OrderId, TransactionId), Vec<OrderInventory>>,
}

/// Third saga stage: reserves stock for every ordered product.
///
/// Every successful command leaves a ledger of `OrderInventory` rows so
/// that compensation can restore the exact previous stock levels. All
/// lines are validated before any stock is touched; a failed command
/// mutates nothing.
#[derive(Debug, Clone)]
pub struct InventoryHandler {
    state: Arc<RwLock<InventoryState>>,
}

impl InventoryHandler {
    /// Creates a handler over initial stock levels per product code.
    pub fn new<I, S>(stock: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(RwLock::new(InventoryState {
                stock: stock
                    .into_iter()
                    .map(|(code, quantity)| (code.into(), quantity))
                    .collect(),
                movements: HashMap::new(),
            })),
        }
    }

    /// Current stock level for a product, if it exists.
    pub fn available(&self, code: &str) -> Option<u32> {
        self.state.read().unwrap().stock.get(code).copied()
    }

    /// Number of orders with recorded stock movements.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().movements.len()
    }
}

#[async_trait]
impl StageHandler for InventoryHandler {
    fn stage(&self) -> StageName {
        StageName::Inventory
    }

    async fn execute(&self, envelope: &mut Envelope) -> Result<String, ValidationError> {
        let key = (envelope.order_id, envelope.transaction_id.clone());
        let mut state = self.state.write().unwrap();

        if state.movements.contains_key(&key) {
            return Err(ValidationError::DuplicateTransaction(
                envelope.transaction_id.clone(),
            ));
        }

        // Plan every movement first; commit only if all lines fit.
        let mut planned: Vec<OrderInventory> = Vec::new();
        for line in &envelope.payload.products {
            let code = &line.product.code;
            let available = match planned.iter().rev().find(|m| &m.product_code == code) {
                Some(movement) => movement.new_quantity,
                None => *state
                    .stock
                    .get(code)
                    .ok_or_else(|| ValidationError::InventoryNotFound(code.clone()))?,
            };
            if line.quantity > available {
                return Err(ValidationError::OutOfStock {
                    code: code.clone(),
                    requested: line.quantity,
                    available,
                });
            }
            planned.push(OrderInventory {
                product_code: code.clone(),
                order_quantity: line.quantity,
                old_quantity: available,
                new_quantity: available - line.quantity,
            });
        }

        for movement in &planned {
            state
                .stock
                .insert(movement.product_code.clone(), movement.new_quantity);
        }
        state.movements.insert(key, planned);
        Ok("Inventory updated successfully".to_string())
    }

    async fn compensate(&self, envelope: &mut Envelope) -> Result<String, ValidationError> {
        let key = (envelope.order_id, envelope.transaction_id.clone());
        let mut state = self.state.write().unwrap();

        match state.movements.remove(&key) {
            Some(movements) => {
                // Restore in reverse so repeated codes end at the level
                // recorded before the first movement.
                for movement in movements.iter().rev() {
                    state
                        .stock
                        .insert(movement.product_code.clone(), movement.old_quantity);
                }
                Ok("Rollback executed for inventory".to_string())
            }
            None => Ok("No inventory reservation to roll back".to_string()),
        }
    }
}
