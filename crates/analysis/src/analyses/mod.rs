//! Analysis definitions for the bundled compute modules.

mod crosstabs;
mod descriptives;
mod frequencies;

pub use crosstabs::Crosstabs;
pub use descriptives::Descriptives;
pub use frequencies::Frequencies;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AnalysisError;

fn decode<T: DeserializeOwned>(action: &str, raw: Value) -> Result<T, AnalysisError> {
    serde_json::from_value(raw).map_err(|e| AnalysisError::Mapping(format!("{action}: {e}")))
}

/// Label if set, otherwise the name.
fn display_name(name: &str, label: &str) -> String {
    if label.is_empty() {
        name.to_string()
    } else {
        label.to_string()
    }
}
