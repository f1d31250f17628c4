//! Participant validation errors.

use common::{Money, OrderId, TransactionId};
use thiserror::Error;

/// Business-rule violation inside a participant.
///
/// Always recoverable: the command consumer converts it into a
/// `ROLLBACK_PENDING` outcome on the envelope, which drives the
/// orchestrator's compensation walk. It never crosses the handler
/// boundary as a panic or a transport failure.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The transaction was already processed by this participant.
    #[error("there is another saga execution for transaction {0}")]
    DuplicateTransaction(TransactionId),

    /// The order carries no product lines.
    #[error("product list is empty")]
    EmptyProductList,

    /// A product line has no usable product code.
    #[error("product must be informed")]
    ProductNotInformed,

    /// The product code is not in the catalog.
    #[error("product {0} does not exist in the catalog")]
    UnknownProduct(String),

    /// The computed order amount is below the accepted minimum.
    #[error("minimum payment amount is {minimum}, order total is {amount}")]
    AmountBelowMinimum {
        /// Computed order total.
        amount: Money,
        /// Configured floor.
        minimum: Money,
    },

    /// No stock row exists for the product.
    #[error("inventory not found for product {0}")]
    InventoryNotFound(String),

    /// Not enough stock to cover the ordered quantity.
    #[error("insufficient stock for product {code}: requested {requested}, available {available}")]
    OutOfStock {
        /// Product code.
        code: String,
        /// Quantity the order asked for.
        requested: u32,
        /// Quantity left in stock.
        available: u32,
    },

    /// A compensation arrived for a record this participant never wrote.
    #[error("{entity} not found for order {order_id}")]
    RecordNotFound {
        /// Kind of domain record.
        entity: &'static str,
        /// Order the compensation referred to.
        order_id: OrderId,
    },
}
