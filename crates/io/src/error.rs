use std::fmt;

use statgrid_engine::DatasetError;

/// Failure writing to or reading from the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// A row would reference a parent that does not exist, or is malformed
    /// (empty title). Nothing was written.
    Integrity(String),
    /// The underlying SQLite store failed.
    Store(String),
    /// A result could not be serialized for storage.
    Serialize(String),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integrity(msg) => write!(f, "audit integrity error: {msg}"),
            Self::Store(msg) => write!(f, "audit store error: {msg}"),
            Self::Serialize(msg) => write!(f, "cannot serialize audit record: {msg}"),
        }
    }
}

impl std::error::Error for AuditError {}

impl From<rusqlite::Error> for AuditError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}

/// Failure saving, loading, importing or exporting a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// Filesystem error (open, read, write).
    Io(String),
    /// SQLite failure.
    Sqlite(String),
    /// CSV reader/writer failure.
    Csv(String),
    /// The file was readable but its contents are not a valid dataset.
    Corrupt(String),
    /// The stored variables violate registry invariants.
    Dataset(DatasetError),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Sqlite(msg) => write!(f, "database error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Corrupt(msg) => write!(f, "corrupt dataset file: {msg}"),
            Self::Dataset(e) => write!(f, "invalid dataset: {e}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<rusqlite::Error> for IoError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<DatasetError> for IoError {
    fn from(e: DatasetError) -> Self {
        Self::Dataset(e)
    }
}
