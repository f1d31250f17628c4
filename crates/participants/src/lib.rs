//! Saga participants.
//!
//! Each participant implements the [`StageHandler`] contract once: a
//! domain action keyed by `(order_id, transaction_id)` against its own
//! private store, and a compensating action that undoes it. The generic
//! [`CommandConsumer`] and [`RollbackConsumer`] bind a handler to the
//! bus and own the outcome protocol, so a participant never publishes
//! anything itself.

pub mod consumer;
pub mod error;
pub mod handler;
pub mod inventory;
pub mod payment;
pub mod product_validation;

pub use consumer::{CommandConsumer, RollbackConsumer, register_participant};
pub use error::ValidationError;
pub use handler::StageHandler;
pub use inventory::{InventoryHandler, OrderInventory};
pub use payment::{PaymentHandler, PaymentRecord, PaymentStatus};
pub use product_validation::ProductValidationHandler;
