//! Internal volume names
//!
//! Maps orchestrator volume names to names ONTAP accepts.

use super::VolumeConfig;
use crate::config::{BackendConfig, OrchestratorContext};

/// Backend-side name of an orchestrator volume
///
/// With a passthrough store the mapping must stay reversible, so the storage
/// prefix is simply prepended. Otherwise the name is joined to the prefix with
/// a hyphen and characters ONTAP rejects are replaced.
pub fn internal_volume_name(
    config: &BackendConfig,
    orchestrator: &OrchestratorContext,
    name: &str,
) -> String {
    if orchestrator.using_passthrough_store {
        return format!("{}{}", config.storage_prefix(), name);
    }

    let prefix = config
        .storage_prefix
        .as_deref()
        .unwrap_or(orchestrator.name.as_str());
    let internal = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}-{}", prefix, name)
    };

    // ONTAP disallows hyphens and periods
    internal
        .replace('-', "_")
        .replace('.', "_")
        .replace("__", "_")
}

/// Fill in the internal names of a volume about to be created
pub fn create_prepare(
    volume_config: &mut VolumeConfig,
    config: &BackendConfig,
    orchestrator: &OrchestratorContext,
) {
    volume_config.internal_name = internal_volume_name(config, orchestrator, &volume_config.name);

    if !volume_config.clone_source_volume.is_empty() {
        volume_config.clone_source_volume_internal =
            internal_volume_name(config, orchestrator, &volume_config.clone_source_volume);
    }
}
