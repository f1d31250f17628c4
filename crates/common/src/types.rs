use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an order.
///
/// Wraps a UUID to provide type safety and prevent mixing up
/// order IDs with other UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Error returned when a string does not match the transaction ID format.
#[derive(Debug, Error)]
#[error("invalid transaction id: {0}")]
pub struct InvalidTransactionId(pub String);

/// Key identifying exactly one saga execution.
///
/// Formatted as `<epochMillis>_<uuid>` so that IDs sort roughly by
/// creation time while remaining globally unique. A second saga run must
/// never reuse an existing transaction ID; participants reject the
/// duplicate as a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generates a fresh transaction ID for a new saga execution.
    pub fn generate() -> Self {
        Self(format!("{}_{}", Utc::now().timestamp_millis(), Uuid::new_v4()))
    }

    /// Parses a transaction ID, validating the `<epochMillis>_<uuid>` shape.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidTransactionId> {
        let value = value.into();
        let Some((millis, uuid)) = value.split_once('_') else {
            return Err(InvalidTransactionId(value));
        };
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidTransactionId(value));
        }
        if Uuid::parse_str(uuid).is_err() {
            return Err(InvalidTransactionId(value));
        }
        Ok(Self(value))
    }

    /// Returns the transaction ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransactionId {
    type Err = InvalidTransactionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_new_creates_unique_ids() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn order_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = OrderId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn order_id_serialization_roundtrip() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn transaction_id_generate_is_unique() {
        let t1 = TransactionId::generate();
        let t2 = TransactionId::generate();
        assert_ne!(t1, t2);
    }

    #[test]
    fn transaction_id_generated_format_parses() {
        let t = TransactionId::generate();
        let parsed = TransactionId::parse(t.as_str()).unwrap();
        assert_eq!(t, parsed);
    }

    #[test]
    fn transaction_id_rejects_malformed_values() {
        assert!(TransactionId::parse("").is_err());
        assert!(TransactionId::parse("no-separator").is_err());
        assert!(TransactionId::parse("_c8e0f6a0-0000-0000-0000-000000000000").is_err());
        assert!(TransactionId::parse("12ab_c8e0f6a0-0000-0000-0000-000000000000").is_err());
        assert!(TransactionId::parse("1700000000000_not-a-uuid").is_err());
    }

    #[test]
    fn transaction_id_accepts_valid_value() {
        let value = format!("1700000000000_{}", Uuid::new_v4());
        let parsed: TransactionId = value.parse().unwrap();
        assert_eq!(parsed.as_str(), value);
    }

    #[test]
    fn transaction_id_serialization_is_transparent() {
        let t = TransactionId::generate();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, format!("\"{}\"", t.as_str()));
    }
}
