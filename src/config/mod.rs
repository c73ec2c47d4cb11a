//! Configuration Module
//!
//! Backend configuration, its defaults, size parsing, and the driver and
//! orchestrator context the configuration is interpreted in.

pub mod backend;
pub mod context;
pub mod size;

pub use backend::*;
pub use context::*;
pub use size::*;
