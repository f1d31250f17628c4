//! Transport error types.

use thiserror::Error;

use crate::topic::Topic;

/// Failure while moving a message through the bus.
///
/// These never cross the `publish` boundary; implementations log them
/// and drop the message.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The envelope could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Nobody is listening on the topic.
    #[error("no subscriber for topic {0}")]
    NoSubscriber(Topic),
}
