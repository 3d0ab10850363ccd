//! Raw result payloads returned by the reference compute modules.
//!
//! Values here are unrounded; rounding to display precision happens when the
//! pipeline maps them into result tables.

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------
// Frequencies
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequenciesOutput {
    pub variables: Vec<FrequencyTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub variable: String,
    #[serde(default)]
    pub label: String,
    /// Distinct valid values, numeric values in numeric order.
    pub rows: Vec<FrequencyRow>,
    /// User-missing values followed by a system-missing row, if any.
    #[serde(default)]
    pub missing_rows: Vec<MissingRow>,
    pub valid: usize,
    pub missing: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRow {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub frequency: usize,
    /// Share of all cases.
    pub percent: f64,
    /// Share of valid cases.
    pub valid_percent: f64,
    pub cumulative_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRow {
    /// `None` for system-missing.
    pub value: Option<String>,
    pub frequency: usize,
    pub percent: f64,
}

// -----------------------------------------------------------------------------
// Descriptives
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptivesOutput {
    pub variables: Vec<DescriptiveStats>,
    /// Cases valid on every variable.
    pub valid_listwise: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub variable: String,
    #[serde(default)]
    pub label: String,
    pub n: usize,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub std_dev: Option<f64>,
    pub variance: Option<f64>,
}

// -----------------------------------------------------------------------------
// Crosstabs
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosstabOutput {
    pub row_variable: String,
    pub column_variable: String,
    pub row_categories: Vec<String>,
    pub column_categories: Vec<String>,
    /// `counts[r][c]` for row category `r` and column category `c`.
    pub counts: Vec<Vec<usize>>,
    pub row_totals: Vec<usize>,
    pub column_totals: Vec<usize>,
    pub total: usize,
    /// Cases missing on either variable.
    pub missing: usize,
}
