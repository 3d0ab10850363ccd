use std::fmt;
use std::time::Duration;

use statgrid_protocol::RequestId;

/// Failure reported by a compute module. Crosses the boundary as
/// `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    /// Malformed or missing fields in the request payload.
    Validation(String),
    /// The module observed a cancellation request and stopped.
    Cancelled,
    /// The module failed for a reason unrelated to its input.
    Internal(String),
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ComputeError {}

/// Failure delivering a request or its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The pool has shut down or its threads are gone.
    ChannelClosed,
    /// No response within the dispatch timeout. The request was cancelled.
    Timeout { id: RequestId, after: Duration },
    /// The request was cancelled before a result arrived.
    Cancelled { id: RequestId },
    /// A response carried an unexpected action tag.
    Correlation { id: RequestId, expected: String, got: String },
    /// The request could not be encoded.
    Encode(String),
    /// A response could not be decoded.
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelClosed => write!(f, "compute pool is not running"),
            Self::Timeout { id, after } => {
                write!(f, "request {id} timed out after {:.1}s", after.as_secs_f64())
            }
            Self::Cancelled { id } => write!(f, "request {id} was cancelled"),
            Self::Correlation { id, expected, got } => {
                write!(f, "request {id}: expected '{expected}', got '{got}'")
            }
            Self::Encode(msg) => write!(f, "cannot encode request: {msg}"),
            Self::Decode(msg) => write!(f, "cannot decode response: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Why a dispatched request produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The module answered `{success: false, error}`.
    Module(String),
    Transport(TransportError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(msg) => write!(f, "compute module failed: {msg}"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<TransportError> for DispatchError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}
