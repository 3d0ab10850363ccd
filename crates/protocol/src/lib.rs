//! StatGrid Compute Protocol (v1 wire format)
//!
//! This crate defines the messages exchanged between the analysis pipeline
//! and isolated compute modules. Every message crosses the boundary as JSON
//! text, so a compute module never shares memory with the dataset.
//!
//! # Correlation
//!
//! Each request carries a monotonically increasing `id` and an `action`
//! name. A successful reply carries the same `id` and the action tagged with
//! `"Response"` (`frequencies` → `frequenciesResponse`). Failures carry the
//! `id` with `success: false`.
//!
//! ```ignore
//! use statgrid_protocol::{ComputeRequest, ComputeResponse};
//!
//! let req = ComputeRequest::new(7, "frequencies", payload)?;
//! let line = serde_json::to_string(&req)?;
//! let reply: ComputeResponse = serde_json::from_str(&reply_line)?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use statgrid_engine::{ValueLabel, Variable};

pub mod results;

/// Current protocol version. Increment for breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Suffix appended to an action name to form its response tag.
pub const RESPONSE_SUFFIX: &str = "Response";

pub type RequestId = u64;

/// Response tag for `action`.
pub fn response_action(action: &str) -> String {
    format!("{action}{RESPONSE_SUFFIX}")
}

// =============================================================================
// Pipeline → Compute
// =============================================================================

/// A unit of work for a compute module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub id: RequestId,
    pub action: String,
    pub data: Value,
}

impl ComputeRequest {
    pub fn new<T: Serialize>(id: RequestId, action: &str, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id,
            action: action.to_string(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Ask the compute side to abandon a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelMessage {
    pub id: RequestId,
}

/// Logical role a group of variables plays in an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisRole {
    /// Variables analyzed one by one (frequencies, descriptives).
    Variables,
    Dependent,
    Independent,
    Grouping,
    Selection,
}

impl AnalysisRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Variables => "variables",
            Self::Dependent => "dependent",
            Self::Independent => "independent",
            Self::Grouping => "grouping",
            Self::Selection => "selection",
        }
    }
}

/// One role's slice: rows in selection order plus matching metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleData {
    pub role: AnalysisRole,
    pub data: Vec<Vec<String>>,
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub value_labels: Vec<ValueLabel>,
}

impl RoleData {
    /// Values of the `index`-th selected variable, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.data
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }
}

/// Payload of every compute request built by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub roles: Vec<RoleData>,
    #[serde(default)]
    pub options: Value,
}

impl TaskPayload {
    pub fn role(&self, role: AnalysisRole) -> Option<&RoleData> {
        self.roles.iter().find(|r| r.role == role)
    }
}

// =============================================================================
// Compute → Pipeline
// =============================================================================

/// Reply from a compute module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComputeResponse {
    Success(SuccessResponse),
    Failure(FailureResponse),
    Cancelled(CancelledResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub id: RequestId,
    pub action: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub id: RequestId,
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelledResponse {
    pub id: RequestId,
    pub cancelled: bool,
}

impl ComputeResponse {
    pub fn success(id: RequestId, action: &str, data: Value) -> Self {
        Self::Success(SuccessResponse {
            id,
            action: response_action(action),
            data,
        })
    }

    pub fn failure(id: RequestId, error: impl Into<String>) -> Self {
        Self::Failure(FailureResponse {
            id,
            success: false,
            error: error.into(),
        })
    }

    pub fn cancelled(id: RequestId) -> Self {
        Self::Cancelled(CancelledResponse { id, cancelled: true })
    }

    pub fn id(&self) -> RequestId {
        match self {
            Self::Success(r) => r.id,
            Self::Failure(r) => r.id,
            Self::Cancelled(r) => r.id,
        }
    }
}
