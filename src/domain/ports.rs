//! Domain Ports - Collaborator traits consumed by the driver
//!
//! These traits define the boundaries between the driver's control logic and
//! external systems: the ONTAP management API, hostname resolution and the
//! local mount tooling. Adapters implement these traits to provide concrete
//! functionality; tests substitute scripted fakes.

use crate::error::{ApiError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

/// Result type for management API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// =============================================================================
// Feature Support
// =============================================================================

/// Capabilities whose availability depends on the remote ONTAP version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// ONTAPI 1.30 (ONTAP 8.3), the oldest release the driver talks to
    MinimumOntapiVersion,
    /// vserver-show-aggr-get-iter, readable by SVM-scoped users (ONTAP 9+)
    VserverShowAggr,
    /// NetApp Volume Encryption
    NetAppVolumeEncryption,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::MinimumOntapiVersion => write!(f, "MINIMUM_ONTAPI_VERSION"),
            Feature::VserverShowAggr => write!(f, "VSERVER_SHOW_AGGR"),
            Feature::NetAppVolumeEncryption => write!(f, "NETAPP_VOLUME_ENCRYPTION"),
        }
    }
}

// =============================================================================
// API Records
// =============================================================================

/// Settings used to construct a management API client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub management_lif: String,
    /// Empty until the SVM is known; an unscoped client talks to the cluster
    pub svm: String,
    pub username: String,
    pub password: String,
}

/// Aggregate name and RAID type as reported by either aggregate listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateAttributes {
    pub name: String,
    /// "hdd", "hybrid", "ssd", or anything else the cluster reports
    pub aggregate_type: String,
}

impl AggregateAttributes {
    pub fn new(name: impl Into<String>, aggregate_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aggregate_type: aggregate_type.into(),
        }
    }
}

/// Snapshot as listed on a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAttributes {
    pub name: String,
    /// Creation time, seconds since the Unix epoch
    pub access_time: i64,
}

/// Read-only view of a load-sharing SnapMirror relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRelationship {
    pub source_location: String,
    pub destination_location: String,
    /// Absent when the cluster omits the field
    pub relationship_status: Option<String>,
}

impl MirrorRelationship {
    /// Whether the relationship reports exactly "idle"
    pub fn is_idle(&self) -> bool {
        self.relationship_status.as_deref() == Some("idle")
    }
}

/// An EMS autosupport event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmsMessage {
    pub app_version: String,
    pub auto_support: bool,
    pub category: String,
    pub computer_name: String,
    pub event_description: String,
    pub event_id: i32,
    pub event_source: String,
    pub log_level: i32,
}

// =============================================================================
// Management API Port
// =============================================================================

/// Port for the ONTAP management API
///
/// Every call is a single request/response; none are retried by the driver.
#[async_trait]
pub trait OntapApi: Send + Sync {
    /// ONTAPI version string of the connected cluster
    async fn ontapi_version(&self) -> ApiResult<String>;

    /// Whether the connected cluster supports a capability
    fn supports_feature(&self, feature: Feature) -> bool;

    /// Serial numbers of the cluster's nodes
    async fn node_serial_numbers(&self) -> ApiResult<Vec<String>>;

    /// Names of the SVMs visible to the client
    async fn svm_names(&self) -> ApiResult<Vec<String>>;

    /// Addresses of the data LIFs serving a protocol ("nfs", "iscsi")
    async fn data_lifs(&self, protocol: &str) -> ApiResult<Vec<String>>;

    /// Names of the aggregates assigned to the SVM
    async fn svm_aggregate_names(&self) -> ApiResult<Vec<String>>;

    /// Aggregate attributes visible to the SVM
    async fn svm_aggregate_attributes(&self) -> ApiResult<Vec<AggregateAttributes>>;

    /// Aggregate attributes at cluster scope; needs cluster privileges
    async fn cluster_aggregate_attributes(&self) -> ApiResult<Vec<AggregateAttributes>>;

    async fn volume_exists(&self, name: &str) -> ApiResult<bool>;

    /// Full names of volumes whose names start with a prefix
    async fn volume_list(&self, prefix: &str) -> ApiResult<Vec<String>>;

    async fn volume_mount(&self, name: &str, junction_path: &str) -> ApiResult<()>;

    async fn volume_clone_create(&self, name: &str, source: &str, snapshot: &str) -> ApiResult<()>;

    async fn volume_clone_split_start(&self, name: &str) -> ApiResult<()>;

    async fn snapshot_create(&self, snapshot: &str, volume: &str) -> ApiResult<()>;

    async fn snapshots_by_volume(&self, volume: &str) -> ApiResult<Vec<SnapshotAttributes>>;

    /// Name of the SVM root volume
    async fn root_volume_name(&self) -> ApiResult<String>;

    /// Load-sharing mirrors whose source is the named volume
    async fn load_sharing_mirrors(&self, volume: &str) -> ApiResult<Vec<MirrorRelationship>>;

    async fn update_load_sharing_mirrors(&self, source_location: &str) -> ApiResult<()>;

    async fn ems_autosupport_log(&self, message: EmsMessage) -> ApiResult<()>;
}

/// Port for constructing management API clients
pub trait ApiClientFactory: Send + Sync {
    fn connect(&self, config: &ClientConfig) -> Result<OntapApiRef>;
}

// =============================================================================
// Host Ports
// =============================================================================

/// Port for hostname resolution
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve a hostname or literal address to one or more IP addresses
    async fn lookup_host(&self, host: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl AddressResolver for SystemResolver {
    async fn lookup_host(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        let mut addresses: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await?
            .map(|addr| addr.ip())
            .collect();
        addresses.dedup();
        Ok(addresses)
    }
}

/// Port for mounting NFS exports on the local host
#[async_trait]
pub trait MountExecutor: Send + Sync {
    async fn mount(&self, export_path: &str, mountpoint: &str, options: &str) -> Result<()>;

    async fn unmount(&self, mountpoint: &str) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type OntapApiRef = Arc<dyn OntapApi>;
pub type MountExecutorRef = Arc<dyn MountExecutor>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_idle_requires_status() {
        let mut mirror = MirrorRelationship {
            source_location: "svm0:svm0_root".into(),
            destination_location: "svm0:svm0_root_m1".into(),
            relationship_status: None,
        };
        assert!(!mirror.is_idle());

        mirror.relationship_status = Some("transferring".into());
        assert!(!mirror.is_idle());

        mirror.relationship_status = Some("idle".into());
        assert!(mirror.is_idle());
    }

    #[tokio::test]
    async fn test_system_resolver_literal_address() {
        let addresses = SystemResolver.lookup_host("127.0.0.1").await.unwrap();
        assert_eq!(addresses, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }
}
