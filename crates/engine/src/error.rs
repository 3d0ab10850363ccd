use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    /// Variable names must be unique.
    DuplicateName(String),
    /// Variable names must be non-empty.
    EmptyName,
    /// Variable names must not contain whitespace.
    InvalidName(String),
    /// No variable with this name.
    UnknownVariable(String),
    /// Column index outside the declared variables.
    ColumnOutOfRange { index: usize, len: usize },
    /// Missing-value declaration is malformed.
    InvalidMissing(String),
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "variable name '{name}' is already in use"),
            Self::EmptyName => write!(f, "variable name must not be empty"),
            Self::InvalidName(name) => write!(f, "invalid variable name '{name}'"),
            Self::UnknownVariable(name) => write!(f, "unknown variable '{name}'"),
            Self::ColumnOutOfRange { index, len } => {
                write!(f, "column {index} out of range ({len} variables)")
            }
            Self::InvalidMissing(msg) => write!(f, "invalid missing values: {msg}"),
        }
    }
}

impl std::error::Error for DatasetError {}
