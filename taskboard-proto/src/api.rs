//! HTTP surface shared by the task service and its clients.
//!
//! Paths, the JSON error body, and encode/decode helpers for task payloads.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::task::TaskId;

/// Path segment of the task collection.
pub const TASKS_SEGMENT: &str = "tasks";

/// Collection path for tasks.
pub const TASKS_PATH: &str = "/tasks";

/// Liveness check path. Never subject to fault injection.
pub const HEALTH_PATH: &str = "/health";

/// Path of a single task resource.
#[must_use]
pub fn task_path(id: &TaskId) -> String {
    format!("{TASKS_PATH}/{id}")
}

/// JSON body returned by the service for any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable reason.
    pub message: String,
}

impl ApiError {
    /// Creates an error body with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error type for JSON encode/decode of wire payloads.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a wire payload as JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a wire payload from JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the bytes are not valid JSON for
/// `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Extracts the message from an error body, falling back to the raw text
/// when the body is not an [`ApiError`].
#[must_use]
pub fn error_message(body: &[u8]) -> String {
    decode::<ApiError>(body).map_or_else(
        |_| String::from_utf8_lossy(body).trim().to_string(),
        |e| e.message,
    )
}
