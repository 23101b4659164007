//! Error types for the record store client.
//!
//! # Design
//! Failures split along one line callers care about: did the record store
//! answer or not. `Remote` carries the status and raw body of any non-2xx
//! response (validation, authorization, unknown type). `Unknown` covers
//! everything where no response was obtained at all. The remaining variants
//! are local: input that can never produce a valid request, or a 2xx body
//! that does not decode.

use thiserror::Error;

/// Errors returned by `RecordClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The record store answered with a non-2xx status.
    #[error("record store returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// No response was obtained (DNS, connect, reset, timeout).
    #[error("record store request failed: {0}")]
    Unknown(String),

    /// The response body could not be deserialized into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid record type `{0}`")]
    InvalidRecordType(String),

    /// Caller fields named one of the store-assigned system fields.
    #[error("system field `{0}` is assigned by the record store")]
    ReservedField(String),

    #[error("invalid constraint on `{key}`: {reason}")]
    InvalidConstraint { key: String, reason: String },
}

impl ApiError {
    /// True when the record store responded but rejected the request.
    pub fn is_remote(&self) -> bool {
        matches!(self, ApiError::Remote { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Remote { status: 404, .. })
    }

    /// HTTP status of a remote rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Raised by a `Transport` when no HTTP response could be obtained.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::Unknown(err.message)
    }
}
