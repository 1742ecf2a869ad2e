//! Error types for procwire-marshal.

use thiserror::Error;

/// Main error type for all marshalling operations.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// Type name is not present in the registry.
    #[error("Type {0:?} has not been registered")]
    UnknownType(String),

    /// Registered type refused to serialize the value.
    #[error("Failed to serialize {type_name}: {reason}")]
    SaveFailed { type_name: String, reason: String },

    /// Registered type refused to deserialize the payload.
    #[error("Failed to deserialize argument value of type {type_name}: {reason}")]
    LoadFailed { type_name: String, reason: String },

    /// Stream ended before the field was complete.
    #[error("Stream underflow: needed {needed} bytes, {remaining} remaining")]
    StreamUnderflow { needed: usize, remaining: usize },

    /// String field is not valid UTF-16.
    #[error("Invalid string: {0}")]
    InvalidString(String),

    /// Pixel buffer payload shorter than its declared byte count.
    #[error("Truncated pixel data: expected {expected} bytes, {available} available")]
    TruncatedPixelData { expected: usize, available: usize },

    /// Declared argument count outside the allowed range.
    #[error("Argument count {count} exceeds maximum {max}")]
    ArityExceeded { count: i64, max: usize },

    /// Response destination type differs from the wire type.
    #[error("Type doesn't match: {found}, expected: {expected}")]
    TypeMismatch { expected: String, found: String },

    /// Envelope kind field holds an unknown discriminant.
    #[error("Invalid envelope kind: {0}")]
    InvalidKind(i32),

    /// Value storage does not match the registered Rust type.
    #[error("Value storage does not match registered type {type_name}")]
    StorageMismatch { type_name: String },

    /// MsgPack serialization error (serde-backed types).
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error (serde-backed types).
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarshalError {
    /// Whether the error means the two peers disagree about registered types.
    pub fn is_registry_skew(&self) -> bool {
        matches!(self, Self::UnknownType(_))
    }

    pub(crate) fn save_failed(type_name: &str, reason: impl ToString) -> Self {
        Self::SaveFailed {
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn load_failed(type_name: &str, reason: impl ToString) -> Self {
        Self::LoadFailed {
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using MarshalError.
pub type Result<T> = std::result::Result<T, MarshalError>;
