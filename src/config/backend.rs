//! Backend Configuration
//!
//! The user-supplied backend configuration, its documented defaults, and the
//! redacted view that is safe to report back to users.

use super::context::{DriverContext, DriverKind, CONFIG_VERSION};
use super::size::convert_size_to_bytes;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_SPACE_RESERVE: &str = "none";
pub const DEFAULT_SNAPSHOT_POLICY: &str = "none";
pub const DEFAULT_UNIX_PERMISSIONS: &str = "---rwxrwxrwx";
pub const DEFAULT_SNAPSHOT_DIR: &str = "false";
pub const DEFAULT_EXPORT_POLICY: &str = "default";
pub const DEFAULT_SECURITY_STYLE: &str = "unix";
pub const DEFAULT_NFS_MOUNT_OPTIONS: &str = "-o nfsvers=3";
pub const DEFAULT_SPLIT_ON_CLONE: &str = "false";
pub const DEFAULT_FILE_SYSTEM_TYPE: &str = "ext4";
pub const DEFAULT_ENCRYPTION: &str = "false";

// =============================================================================
// Backend Config
// =============================================================================

/// Configuration of one ONTAP backend
///
/// Decoded from the backend's JSON definition, then completed by
/// [`BackendConfig::populate_defaults`]. After initialization only the SVM
/// (when derived) and the serial numbers are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendConfig {
    pub version: u32,
    pub storage_driver_name: String,
    pub backend_name: String,
    /// `None` means "use the context default"; `Some("")` disables the prefix
    pub storage_prefix: Option<String>,

    #[serde(rename = "managementLIF")]
    pub management_lif: String,
    #[serde(rename = "dataLIF")]
    pub data_lif: String,
    pub igroup_name: String,
    pub svm: String,
    pub username: String,
    pub password: String,
    /// Restrict provisioning to this aggregate when set
    pub aggregate: String,
    /// Telemetry interval in hours, as a decimal string
    pub usage_heartbeat: String,

    pub size: String,
    pub space_reserve: String,
    pub snapshot_policy: String,
    pub unix_permissions: String,
    pub snapshot_dir: String,
    pub export_policy: String,
    pub security_style: String,
    pub nfs_mount_options: String,
    pub split_on_clone: String,
    pub file_system_type: String,
    pub encryption: String,

    #[serde(skip)]
    pub driver_context: DriverContext,
    #[serde(skip)]
    pub serial_numbers: Vec<String>,
}

impl BackendConfig {
    /// Decode a backend definition for the given frontend context
    pub fn from_json(json: &str, context: DriverContext) -> Result<Self> {
        let mut config: BackendConfig = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("could not decode JSON configuration: {}", e)))?;
        config.driver_context = context;
        Ok(config)
    }

    /// Read and decode a backend definition file
    pub fn load(path: impl AsRef<Path>, context: DriverContext) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json, context)
    }

    /// Fill in defaults for every unset option and validate the explicit ones
    ///
    /// Applying this twice yields the same config as applying it once.
    pub fn populate_defaults(&mut self, driver: DriverKind) -> Result<()> {
        if self.size.is_empty() {
            self.size = driver.default_volume_size().to_string();
        } else {
            convert_size_to_bytes(&self.size).map_err(|e| {
                Error::Config(format!("invalid config value for default volume size: {}", e))
            })?;
        }

        if self.storage_prefix.is_none() {
            self.storage_prefix = Some(self.driver_context.default_storage_prefix().to_string());
        }

        if self.storage_driver_name.is_empty() {
            self.storage_driver_name = driver.name().to_string();
        }

        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }

        set_default(&mut self.space_reserve, DEFAULT_SPACE_RESERVE);
        set_default(&mut self.snapshot_policy, DEFAULT_SNAPSHOT_POLICY);
        set_default(&mut self.unix_permissions, DEFAULT_UNIX_PERMISSIONS);
        set_default(&mut self.snapshot_dir, DEFAULT_SNAPSHOT_DIR);
        set_default(&mut self.export_policy, DEFAULT_EXPORT_POLICY);
        set_default(&mut self.security_style, DEFAULT_SECURITY_STYLE);
        set_default(&mut self.nfs_mount_options, DEFAULT_NFS_MOUNT_OPTIONS);

        if self.split_on_clone.is_empty() {
            self.split_on_clone = DEFAULT_SPLIT_ON_CLONE.to_string();
        } else {
            parse_bool(&self.split_on_clone).map_err(|e| {
                Error::Config(format!("invalid boolean value for splitOnClone: {}", e))
            })?;
        }

        set_default(&mut self.file_system_type, DEFAULT_FILE_SYSTEM_TYPE);
        set_default(&mut self.encryption, DEFAULT_ENCRYPTION);

        debug!(
            storage_prefix = %self.storage_prefix(),
            space_reserve = %self.space_reserve,
            snapshot_policy = %self.snapshot_policy,
            unix_permissions = %self.unix_permissions,
            snapshot_dir = %self.snapshot_dir,
            export_policy = %self.export_policy,
            security_style = %self.security_style,
            nfs_mount_options = %self.nfs_mount_options,
            split_on_clone = %self.split_on_clone,
            file_system_type = %self.file_system_type,
            encryption = %self.encryption,
            size = %self.size,
            "Configuration defaults"
        );

        Ok(())
    }

    /// Effective storage prefix; empty before defaults are applied
    pub fn storage_prefix(&self) -> &str {
        self.storage_prefix.as_deref().unwrap_or_default()
    }

    /// Whether new clones are split from their parents by default
    pub fn split_on_clone_enabled(&self) -> Result<bool> {
        parse_bool(&self.split_on_clone)
            .map_err(|e| Error::Config(format!("invalid boolean value for splitOnClone: {}", e)))
    }

    /// Redacted view of this config for display
    pub fn external(&self) -> ExternalConfig {
        ExternalConfig {
            version: self.version,
            storage_driver_name: self.storage_driver_name.clone(),
            backend_name: self.backend_name.clone(),
            storage_prefix: self.storage_prefix().to_string(),
            serial_numbers: self.serial_numbers.clone(),
            management_lif: self.management_lif.clone(),
            data_lif: self.data_lif.clone(),
            igroup_name: self.igroup_name.clone(),
            svm: self.svm.clone(),
        }
    }
}

fn set_default(field: &mut String, default: &str) {
    if field.is_empty() {
        *field = default.to_string();
    }
}

/// Parse a boolean the way backend definitions spell them
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false counterparts.
pub fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid syntax: {:?}", other)),
    }
}

// =============================================================================
// External Config
// =============================================================================

/// Backend config without credentials, as reported to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalConfig {
    pub version: u32,
    pub storage_driver_name: String,
    pub backend_name: String,
    pub storage_prefix: String,
    pub serial_numbers: Vec<String>,
    #[serde(rename = "managementLIF")]
    pub management_lif: String,
    #[serde(rename = "dataLIF")]
    pub data_lif: String,
    pub igroup_name: String,
    pub svm: String,
}
