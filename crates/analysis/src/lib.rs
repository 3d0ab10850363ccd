//! `statgrid-analysis`: runs statistical procedures against a dataset.
//!
//! An [`Analysis`] names the variables it needs per role and the compute
//! action that processes them. The [`Pipeline`] slices those variables,
//! sends them across the compute boundary, maps the reply into
//! [`ResultTable`]s and records the run in the audit store.

pub mod analyses;
pub mod error;
pub mod pipeline;
pub mod table;

pub use error::AnalysisError;
pub use pipeline::{
    Analysis, AnalysisReport, AnalyticOutput, PendingAnalysis, Pipeline, PipelineState, StatisticOutput,
};
pub use table::{ColumnHeader, Precision, ResultRow, ResultTable, TableValue};
