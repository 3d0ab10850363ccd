use std::fmt;

use statgrid_compute::{DispatchError, TransportError};
use statgrid_io::AuditError;

/// Why an analysis ended in the Failed state. No audit rows exist for a
/// failed analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The compute module answered `{success: false, error}`.
    Compute(String),
    /// The request or its response could not be delivered.
    Transport(TransportError),
    /// The raw result did not match the shape the analysis expects, or the
    /// resulting table is malformed.
    Mapping(String),
    /// The audit chain could not be written.
    Audit(AuditError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute(msg) => write!(f, "compute failed: {msg}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Mapping(msg) => write!(f, "cannot map result: {msg}"),
            Self::Audit(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<DispatchError> for AnalysisError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Module(msg) => Self::Compute(msg),
            DispatchError::Transport(t) => Self::Transport(t),
        }
    }
}

impl From<TransportError> for AnalysisError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<AuditError> for AnalysisError {
    fn from(e: AuditError) -> Self {
        Self::Audit(e)
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        Self::Mapping(e.to_string())
    }
}
