//! Error types for wirecall.

use thiserror::Error;

use crate::protocol::HEADER_SIZE;

/// Failure raised by a worker operation.
pub type OperationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for all wirecall operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// I/O error during socket/stream operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer disconnected in the middle of a frame, or the transport is no longer usable.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A read or a whole call did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Fixed header bytes did not match and the header was not the session-end sentinel.
    #[error("Invalid frame header: {0:02X?}")]
    InvalidHeader([u8; HEADER_SIZE]),

    /// Header declared a payload larger than the configured maximum.
    #[error("Payload size {length} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Length declared by the header.
        length: u64,
        /// Configured limit.
        max: u64,
    },

    /// Frame payload could not be decoded into an envelope.
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[source] rmp_serde::decode::Error),

    /// A value could not be encoded by the codec.
    #[error("MsgPack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// A result blob could not be decoded into the expected type.
    #[error("MsgPack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Operation name is not part of the contract.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Fewer argument blobs than the operation declares.
    #[error("Operation {operation} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Operation name.
        operation: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied blob count.
        actual: usize,
    },

    /// An argument blob did not decode into its declared parameter type.
    #[error("Argument {index} of {operation} is invalid: {source}")]
    InvalidArgument {
        /// Operation name.
        operation: String,
        /// Zero-based parameter position.
        index: usize,
        /// Codec failure.
        #[source]
        source: rmp_serde::decode::Error,
    },

    /// The invoked operation itself failed.
    #[error("Operation {operation} failed: {source}")]
    InvocationFailed {
        /// Operation name.
        operation: String,
        /// Failure produced by the worker.
        #[source]
        source: OperationError,
    },

    /// A typed method reference does not map to an operation of the contract.
    #[error("Method {0:?} does not resolve to an operation")]
    TargetResolutionFailed(String),

    /// A lifecycle hook failed.
    #[error("Hook failed: {0}")]
    Hook(#[source] OperationError),

    /// Cooperative cancellation interrupted a receive.
    #[error("Cancelled")]
    Cancelled,

    /// Invalid configuration document.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl RpcError {
    /// True for failures of the underlying connection rather than of the protocol or a call.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RpcError::Io(_) | RpcError::ConnectionClosed | RpcError::Timeout(_)
        )
    }
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;
