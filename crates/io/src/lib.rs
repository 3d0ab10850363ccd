//! Persistence for statgrid: the native SQLite dataset file, CSV exchange,
//! and the append-only audit store that lives in the same file.

pub mod audit;
pub mod csv;
pub mod error;
pub mod native;

pub use audit::{
    Analytic, AnalyticId, AuditChain, AuditStore, ChainIds, Log, LogId, Statistic, StatisticDraft, StatisticId,
};
pub use error::{AuditError, IoError};

/// Native .sgrid format version
/// Increment when schema changes in a way that old versions can't read
pub const NATIVE_FORMAT_VERSION: u32 = 1;
