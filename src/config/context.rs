//! Driver and orchestrator context
//!
//! Identifies which ONTAP driver flavour is running, which frontend hosts it,
//! and the process-wide orchestrator settings that influence volume naming and
//! telemetry. The orchestrator settings are passed explicitly so callers (and
//! tests) can vary them per call.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Storage prefix used when running as a Docker volume plugin
pub const DEFAULT_DOCKER_STORAGE_PREFIX: &str = "netappdvp_";

/// Storage prefix used when running under Kubernetes
pub const DEFAULT_KUBERNETES_STORAGE_PREFIX: &str = "trident_";

/// Default volume size when the backend config names none
pub const DEFAULT_VOLUME_SIZE: &str = "1G";

/// Backend config schema version
pub const CONFIG_VERSION: u32 = 1;

// =============================================================================
// Driver Context
// =============================================================================

/// Frontend hosting the driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverContext {
    Docker,
    #[default]
    Kubernetes,
}

impl DriverContext {
    /// Storage prefix applied when the backend config does not set one
    pub fn default_storage_prefix(&self) -> &'static str {
        match self {
            DriverContext::Docker => DEFAULT_DOCKER_STORAGE_PREFIX,
            DriverContext::Kubernetes => DEFAULT_KUBERNETES_STORAGE_PREFIX,
        }
    }
}

impl std::fmt::Display for DriverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverContext::Docker => write!(f, "docker"),
            DriverContext::Kubernetes => write!(f, "kubernetes"),
        }
    }
}

impl FromStr for DriverContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(DriverContext::Docker),
            "kubernetes" | "csi" => Ok(DriverContext::Kubernetes),
            other => Err(format!("unknown driver context: {}", other)),
        }
    }
}

// =============================================================================
// Driver Kind
// =============================================================================

/// ONTAP driver flavours sharing this control logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    #[serde(rename = "ontap-nas")]
    OntapNas,
    #[serde(rename = "ontap-nas-economy")]
    OntapNasEconomy,
    #[serde(rename = "ontap-san")]
    OntapSan,
}

impl DriverKind {
    /// Driver name as it appears in backend configs and telemetry
    pub fn name(&self) -> &'static str {
        match self {
            DriverKind::OntapNas => "ontap-nas",
            DriverKind::OntapNasEconomy => "ontap-nas-economy",
            DriverKind::OntapSan => "ontap-san",
        }
    }

    /// Whether volumes are served over NFS from data LIFs
    pub fn is_nas(&self) -> bool {
        matches!(self, DriverKind::OntapNas | DriverKind::OntapNasEconomy)
    }

    /// Whether each volume is mounted into the SVM namespace at its own junction
    pub fn mounts_volume_junctions(&self) -> bool {
        matches!(self, DriverKind::OntapNas)
    }

    /// Volume size applied when the backend config does not set one
    pub fn default_volume_size(&self) -> &'static str {
        DEFAULT_VOLUME_SIZE
    }
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ontap-nas" => Ok(DriverKind::OntapNas),
            "ontap-nas-economy" => Ok(DriverKind::OntapNasEconomy),
            "ontap-san" => Ok(DriverKind::OntapSan),
            other => Err(format!("unknown ONTAP driver: {}", other)),
        }
    }
}

// =============================================================================
// Orchestrator Context
// =============================================================================

/// Process-wide orchestrator identity and naming switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorContext {
    /// Orchestrator name, also the EMS event source
    pub name: String,
    pub version: String,
    /// Container platform the orchestrator runs on
    pub platform: String,
    pub platform_version: String,
    /// With a passthrough store, backend names must map back to volume names
    #[serde(skip)]
    pub using_passthrough_store: bool,
}

impl Default for OrchestratorContext {
    fn default() -> Self {
        Self {
            name: "trident".to_string(),
            version: crate::VERSION.to_string(),
            platform: "kubernetes".to_string(),
            platform_version: String::new(),
            using_passthrough_store: false,
        }
    }
}
