//! Names of the event sources that can own an envelope.

use serde::{Deserialize, Serialize};

/// The stage (participant or orchestrator) that produced an event.
///
/// Adding a participant means adding a variant here and one entry to the
/// saga topology; no routing code changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageName {
    /// The central engine itself.
    Orchestrator,

    /// Validates the products in the order against the catalog.
    ProductValidation,

    /// Charges the order amount.
    Payment,

    /// Reserves stock for the order.
    Inventory,
}

impl StageName {
    /// Returns the stage name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Orchestrator => "ORCHESTRATOR",
            StageName::ProductValidation => "PRODUCT_VALIDATION",
            StageName::Payment => "PAYMENT",
            StageName::Inventory => "INVENTORY",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
