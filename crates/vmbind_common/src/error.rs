use thiserror::Error;

/// Errors raised while moving hub messages over the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    /// A message could not be encoded to JSON.
    #[error("failed to serialize hub message: {0}")]
    Serialization(String),

    /// An incoming frame was not a valid hub message.
    #[error("failed to deserialize hub message: {0}")]
    Deserialization(String),
}
