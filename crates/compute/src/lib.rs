//! `statgrid-compute`: isolated compute boundary.
//!
//! Compute modules receive JSON data and return JSON results. They never see
//! the dataset itself, only the snapshot slice serialized into the request.

pub mod error;
pub mod module;
pub mod modules;
pub mod oneshot;
pub mod pool;

pub use error::{ComputeError, DispatchError, TransportError};
pub use module::{CancelToken, ComputeModule, ModuleRegistry};
pub use pool::{Canceller, ComputePool, PoolConfig, PoolStats, Ticket};
