//! `statgrid-engine`: the typed case × variable dataset.
//!
//! Pure in-memory crate: cell store, variable registry, value labels and the
//! slicing service. No IO, no threads.

pub mod cell;
pub mod dataset;
pub mod error;
pub mod events;
pub mod slice;
pub mod store;
pub mod value_label;
pub mod variable;

pub use cell::CellChange;
pub use dataset::{Dataset, Slice};
pub use error::DatasetError;
pub use events::DatasetEvent;
pub use store::CellStore;
pub use value_label::ValueLabel;
pub use variable::{Align, Measure, MissingValues, Role, Variable, VariableType, VariableUpdate};
