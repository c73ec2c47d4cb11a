//! Domain layer - Collaborator port definitions
//!
//! The management API client, hostname resolution and local mount tooling
//! are consumed through the traits defined here.

pub mod ports;

pub use ports::*;
