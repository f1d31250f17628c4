//! Topic names for every queue in the saga deployment.

use serde::{Deserialize, Serialize};

/// A logical topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the topic name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The full set of topics used by the saga deployment.
///
/// Passed explicitly into the topology and the consumers at startup;
/// there is no ambient global configuration. Each participant owns a
/// `*_success` topic (its forward command inbox) and a `*_fail` topic
/// (its rollback command inbox); all outcomes flow back through the
/// single `orchestrator` inbox.
#[derive(Debug, Clone)]
pub struct Topics {
    /// New sagas enter here.
    pub start_saga: Topic,
    /// Outcome inbox consumed by the orchestrator.
    pub orchestrator: Topic,
    /// Product validation command inbox.
    pub product_validation_success: Topic,
    /// Product validation rollback inbox.
    pub product_validation_fail: Topic,
    /// Payment command inbox.
    pub payment_success: Topic,
    /// Payment rollback inbox.
    pub payment_fail: Topic,
    /// Inventory command inbox.
    pub inventory_success: Topic,
    /// Inventory rollback inbox.
    pub inventory_fail: Topic,
    /// Sagas that ended successfully.
    pub finish_success: Topic,
    /// Sagas that ended in failure.
    pub finish_fail: Topic,
    /// Every terminal saga, success or failure.
    pub notify_ending: Topic,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            start_saga: Topic::from("start-saga"),
            orchestrator: Topic::from("base-orchestrator"),
            product_validation_success: Topic::from("product-validation-success"),
            product_validation_fail: Topic::from("product-validation-fail"),
            payment_success: Topic::from("payment-success"),
            payment_fail: Topic::from("payment-fail"),
            inventory_success: Topic::from("inventory-success"),
            inventory_fail: Topic::from("inventory-fail"),
            finish_success: Topic::from("finish-success"),
            finish_fail: Topic::from("finish-fail"),
            notify_ending: Topic::from("notify-ending"),
        }
    }
}
