//! Volume Operations
//!
//! Per-volume helpers shared by the ONTAP drivers: size resolution, encryption
//! checks, existence and listing queries, provisioning options and internal
//! name derivation. The clone workflow lives in [`clone`].

pub mod clone;
pub mod naming;

pub use clone::*;
pub use naming::*;

use crate::config::{convert_size_to_bytes, parse_bool, BackendConfig};
use crate::discovery::{attr, CapacityPool};
use crate::domain::ports::{Feature, OntapApi};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Smallest volume the driver will create
pub const MINIMUM_VOLUME_SIZE_BYTES: u64 = 20 * 1024 * 1024;

// =============================================================================
// Volume Config
// =============================================================================

/// Per-volume settings supplied by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeConfig {
    pub name: String,
    pub internal_name: String,
    pub size: String,
    pub clone_source_volume: String,
    pub clone_source_volume_internal: String,
    pub clone_source_snapshot: String,
    pub snapshot_policy: String,
    pub unix_permissions: String,
    pub snapshot_dir: String,
    pub export_policy: String,
    pub space_reserve: String,
    pub security_style: String,
    pub split_on_clone: String,
    pub file_system: String,
    pub encryption: String,
}

/// Snapshot as reported to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub name: String,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub created: String,
}

// =============================================================================
// Size and Encryption
// =============================================================================

/// Resolve the size of a new volume
///
/// Zero selects the backend's default size. Anything below
/// [`MINIMUM_VOLUME_SIZE_BYTES`] is rejected.
pub fn get_volume_size(size_bytes: u64, config: &BackendConfig) -> Result<u64> {
    let size_bytes = if size_bytes == 0 {
        convert_size_to_bytes(&config.size)?
    } else {
        size_bytes
    };

    if size_bytes < MINIMUM_VOLUME_SIZE_BYTES {
        return Err(Error::VolumeSizeTooSmall {
            requested: size_bytes,
            minimum: MINIMUM_VOLUME_SIZE_BYTES,
        });
    }

    Ok(size_bytes)
}

/// Resolve the size of a new volume from a size string
pub fn resolve_volume_size(size: &str, config: &BackendConfig) -> Result<u64> {
    let size_bytes = if size.trim().is_empty() {
        0
    } else {
        convert_size_to_bytes(size)?
    };
    get_volume_size(size_bytes, config)
}

/// Decide what encryption setting to send with a volume create
///
/// Returns `None` when the cluster does not support volume encryption and
/// none was requested, so the request can omit the field entirely.
pub fn validate_encryption_attribute(encryption: &str, api: &dyn OntapApi) -> Result<Option<bool>> {
    let enable = parse_bool(encryption)
        .map_err(|e| Error::Config(format!("invalid boolean value for encryption: {}", e)))?;

    if api.supports_feature(Feature::NetAppVolumeEncryption) {
        Ok(Some(enable))
    } else if enable {
        Err(Error::EncryptionUnsupported)
    } else {
        Ok(None)
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Fail unless the named volume exists
pub async fn get_volume(name: &str, api: &dyn OntapApi) -> Result<()> {
    if !api.volume_exists(name).await? {
        debug!(flexvol = %name, "Flexvol not found.");
        return Err(Error::VolumeNotFound {
            volume: name.to_string(),
        });
    }
    Ok(())
}

/// Names of this backend's volumes, without the storage prefix
pub async fn get_volume_list(api: &dyn OntapApi, config: &BackendConfig) -> Result<Vec<String>> {
    let prefix = config.storage_prefix();
    let volumes = api.volume_list(prefix).await?;

    Ok(volumes
        .into_iter()
        .filter_map(|v| v.strip_prefix(prefix).map(str::to_string))
        .collect())
}

/// Snapshots of the named volume
pub async fn get_snapshot_list(name: &str, api: &dyn OntapApi) -> Result<Vec<Snapshot>> {
    let snapshots = api.snapshots_by_volume(name).await?;
    debug!("Returned {} snapshots.", snapshots.len());

    Ok(snapshots
        .into_iter()
        .map(|snap| {
            let created = DateTime::<Utc>::from_timestamp(snap.access_time, 0)
                .unwrap_or_default()
                .format("%Y-%m-%dT%H:%M:%SZ")
                .to_string();
            debug!(name = %snap.name, access_time = snap.access_time, "Snapshot");
            Snapshot {
                name: snap.name,
                created,
            }
        })
        .collect())
}

// =============================================================================
// Provisioning Options
// =============================================================================

/// Build the option map for a volume create
///
/// Storage class requests (`provisioningType`, `encryption`) are applied first
/// and explicit volume config values override them. Requests of the wrong type
/// are ignored with a warning.
pub fn volume_opts(
    volume_config: &VolumeConfig,
    pool: Option<&CapacityPool>,
    requests: &BTreeMap<String, Value>,
) -> BTreeMap<String, String> {
    let mut opts = BTreeMap::new();

    if let Some(pool) = pool {
        opts.insert("aggregate".to_string(), pool.name.clone());
    }

    if let Some(request) = requests.get(attr::PROVISIONING_TYPE) {
        match request.as_str() {
            Some("thin") => {
                opts.insert("spaceReserve".to_string(), "none".to_string());
            }
            Some("thick") => {
                opts.insert("spaceReserve".to_string(), "volume".to_string());
            }
            Some(_) => warn!(
                provisioning_type = %request,
                "Expected 'thick' or 'thin' for {}; ignoring.",
                attr::PROVISIONING_TYPE
            ),
            None => warn!(
                provisioning_type = %request,
                "Expected string for {}; ignoring.",
                attr::PROVISIONING_TYPE
            ),
        }
    }

    if let Some(request) = requests.get(attr::ENCRYPTION) {
        match request.as_bool() {
            Some(true) => {
                opts.insert("encryption".to_string(), "true".to_string());
            }
            Some(false) => {}
            None => warn!(encryption = %request, "Expected bool for {}; ignoring.", attr::ENCRYPTION),
        }
    }

    let explicit = [
        ("snapshotPolicy", &volume_config.snapshot_policy),
        ("unixPermissions", &volume_config.unix_permissions),
        ("snapshotDir", &volume_config.snapshot_dir),
        ("exportPolicy", &volume_config.export_policy),
        ("spaceReserve", &volume_config.space_reserve),
        ("securityStyle", &volume_config.security_style),
        ("splitOnClone", &volume_config.split_on_clone),
        ("fileSystemType", &volume_config.file_system),
        ("encryption", &volume_config.encryption),
    ];
    for (key, value) in explicit {
        if !value.is_empty() {
            opts.insert(key.to_string(), value.clone());
        }
    }

    opts
}
