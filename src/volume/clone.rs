//! Clone Workflow
//!
//! Creates a FlexClone of an existing volume:
//!
//! 1. refuse if the target already exists
//! 2. snapshot the source unless a snapshot was named
//! 3. clone the source at that snapshot
//! 4. junction-mount the clone (drivers that mount volumes individually)
//! 5. start a split from the parent, if requested
//!
//! The first failing step ends the workflow. Completed steps are not rolled
//! back; a snapshot or clone left behind must be cleaned up by the caller.

use crate::config::DriverKind;
use crate::domain::ports::OntapApi;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Format of generated snapshot names; sorts lexically by time
pub const SNAPSHOT_NAME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A request to clone a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRequest {
    /// Internal name of the new volume
    pub name: String,
    /// Internal name of the volume to clone
    pub source: String,
    /// Existing snapshot to clone from; a new one is taken when `None`
    pub snapshot: Option<String>,
    /// Start splitting the clone from its parent once created
    pub split: bool,
}

/// What the workflow did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOutcome {
    /// Snapshot the clone was created from
    pub snapshot: String,
    /// Whether the snapshot was taken by this workflow
    pub snapshot_created: bool,
    /// Junction path, when the clone was mounted
    pub junction: Option<String>,
    pub split_started: bool,
}

/// Name for a snapshot taken at `now`
pub fn snapshot_name(now: DateTime<Utc>) -> String {
    now.format(SNAPSHOT_NAME_FORMAT).to_string()
}

/// Create `request.name` as a clone of `request.source`
pub async fn create_clone(
    api: &dyn OntapApi,
    driver: DriverKind,
    request: &CloneRequest,
) -> Result<CloneOutcome> {
    let CloneRequest {
        name,
        source,
        snapshot,
        split,
    } = request;

    debug!(
        name = %name,
        source = %source,
        snapshot = ?snapshot,
        split = split,
        "Creating clone."
    );

    if api.volume_exists(name).await? {
        return Err(Error::AlreadyExists {
            volume: name.clone(),
        });
    }

    let (snapshot, snapshot_created) = match snapshot {
        Some(snapshot) if !snapshot.is_empty() => (snapshot.clone(), false),
        _ => {
            let snapshot = snapshot_name(Utc::now());
            api.snapshot_create(&snapshot, source)
                .await
                .map_err(|e| Error::SnapshotCreateFailed {
                    snapshot: snapshot.clone(),
                    volume: source.clone(),
                    source: e,
                })?;
            debug!("Created snapshot {} of volume {}", snapshot, source);
            (snapshot, true)
        }
    };

    api.volume_clone_create(name, source, &snapshot)
        .await
        .map_err(|e| {
            if e.is_object_not_found() {
                Error::SnapshotNotFound {
                    snapshot: snapshot.clone(),
                    volume: source.clone(),
                }
            } else {
                Error::CloneCreateFailed {
                    volume: name.clone(),
                    source: e,
                }
            }
        })?;

    let junction = if driver.mounts_volume_junctions() {
        let junction = format!("/{}", name);
        api.volume_mount(name, &junction)
            .await
            .map_err(|e| Error::MountFailed {
                volume: name.clone(),
                junction: junction.clone(),
                source: e,
            })?;
        Some(junction)
    } else {
        None
    };

    if *split {
        api.volume_clone_split_start(name)
            .await
            .map_err(|e| Error::SplitFailed {
                volume: name.clone(),
                source: e,
            })?;
    }

    info!("Created clone {} of volume {} from snapshot {}", name, source, snapshot);

    Ok(CloneOutcome {
        snapshot,
        snapshot_created,
        junction,
        split_started: *split,
    })
}
