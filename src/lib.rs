//! ONTAP Driver Common
//!
//! Control logic shared by the ONTAP NAS and SAN storage drivers: backend
//! configuration, endpoint resolution, capacity pool discovery, volume
//! cloning, load-sharing mirror synchronization and the EMS usage heartbeat.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                             OntapDriver                              │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  initialize:  config ──► endpoint ──► defaults ──► heartbeat.start   │
//! │  operations:  discovery │ clone ──► mirror sync │ mount │ unmount    │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                Ports                                 │
//! │  ┌────────────┐ ┌──────────────────┐ ┌───────────────┐ ┌──────────┐  │
//! │  │  OntapApi  │ │ ApiClientFactory │ │AddressResolver│ │ Mounter  │  │
//! │  └────────────┘ └──────────────────┘ └───────────────┘ └──────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Backend configuration, defaults and size parsing
//! - [`driver`]: Startup sequence, endpoint validation and the driver handle
//! - [`discovery`]: Capacity pools and media attributes
//! - [`volume`]: Per-volume helpers and the clone workflow
//! - [`mirror`]: Load-sharing mirror update and wait
//! - [`telemetry`]: EMS heartbeat
//! - [`mount`]: Local NFS mounts
//! - [`domain`]: Ports to the management API and the host
//! - [`error`]: Error types and handling

pub mod config;
pub mod discovery;
pub mod domain;
pub mod driver;
pub mod error;
pub mod mirror;
pub mod mount;
pub mod telemetry;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{
    convert_size_to_bytes, BackendConfig, DriverContext, DriverKind, ExternalConfig,
    OrchestratorContext,
};

pub use discovery::{discover_storage_pools, CapacityPool, DiscoveryReport, DiscoveryWarning, Media, Offer};

pub use domain::ports::{
    AddressResolver, ApiClientFactory, ApiResult, ClientConfig, Feature, MountExecutor, OntapApi,
    SystemResolver,
};

pub use driver::{initialize_driver, OntapDriver};

pub use error::{ApiError, Error, ErrorScope, Result};

pub use mirror::{MirrorSyncOutcome, MirrorSyncWaiter};

pub use mount::NfsMountExecutor;

pub use telemetry::{Heartbeat, Telemetry};

pub use volume::{create_clone, CloneOutcome, CloneRequest, VolumeConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
