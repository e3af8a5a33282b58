//! Infrastructure adapters and runtime bootstrap.

pub mod completion;
pub mod error;
pub mod store;
pub mod telemetry;
