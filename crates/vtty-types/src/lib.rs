//! Foundation types for VTTY.
//!
//! This crate contains the types shared by every VTTY crate: the error
//! type, runtime configuration, signal kinds, and task identifiers/states.

pub mod config;
pub mod error;
pub mod signal;
pub mod sync;
pub mod task;

pub use config::VttyConfig;
pub use error::{Result, VttyError};
pub use signal::{Signal, SignalKind};
pub use task::{TaskId, TaskIdCounter, TaskState, parse_task_id};
