//! Shared identifier and value types for the order saga system.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{InvalidTransactionId, OrderId, TransactionId};
