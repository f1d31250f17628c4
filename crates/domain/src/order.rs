//! Order payload carried inside the envelope.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, TransactionId};
use serde::{Deserialize, Serialize};

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog code (e.g. `"BOOKS"`).
    pub code: String,
    /// Price per unit.
    pub unit_value: Money,
}

impl Product {
    /// Creates a product from a code and unit price.
    pub fn new(code: impl Into<String>, unit_value: Money) -> Self {
        Self {
            code: code.into(),
            unit_value,
        }
    }
}

/// A product line in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProduct {
    /// The ordered product.
    pub product: Product,
    /// How many units were ordered.
    pub quantity: u32,
}

impl OrderProduct {
    /// Creates an order line.
    pub fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }
}

/// The order being fulfilled by a saga execution.
///
/// `total_amount` and `total_items` start at zero; the payment stage
/// computes them from the product lines and writes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identity.
    pub id: OrderId,
    /// Product lines.
    pub products: Vec<OrderProduct>,
    /// When the order was created at ingress.
    pub created_at: DateTime<Utc>,
    /// The saga execution this order instance belongs to.
    pub transaction_id: TransactionId,
    /// Computed aggregate: sum of `quantity * unit_value`.
    pub total_amount: Money,
    /// Computed aggregate: sum of quantities.
    pub total_items: u32,
}

impl Order {
    /// Creates a new order with a fresh ID and transaction ID.
    pub fn new(products: Vec<OrderProduct>) -> Self {
        Self {
            id: OrderId::new(),
            products,
            created_at: Utc::now(),
            transaction_id: TransactionId::generate(),
            total_amount: Money::zero(),
            total_items: 0,
        }
    }

    /// Sum of unit value times quantity over all product lines.
    pub fn amount_due(&self) -> Money {
        self.products
            .iter()
            .map(|line| line.product.unit_value.multiply(line.quantity))
            .sum()
    }

    /// Sum of quantities over all product lines.
    pub fn item_count(&self) -> u32 {
        self.products.iter().map(|line| line.quantity).sum()
    }
}
