//! Load-Sharing Mirror Sync
//!
//! After a volume is mounted into the SVM namespace, load-sharing mirrors of
//! the SVM root volume must be updated before the new junction is visible
//! through them. The waiter triggers the update and polls until the mirrors
//! settle or a deadline passes. Every failure is logged and swallowed; the
//! caller's operation has already succeeded.

use crate::domain::ports::OntapApi;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Seconds to wait for mirrors to become idle
pub const LS_MIRROR_IDLE_TIMEOUT_SECS: u64 = 30;

/// How the wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorSyncOutcome {
    /// The SVM root volume could not be identified
    RootVolumeUnavailable,
    /// The root volume has no load-sharing mirrors, or they could not be listed
    NoMirrors,
    /// The mirror update was rejected
    UpdateFailed,
    /// All mirrors reported idle
    Idle { polls: u32 },
    /// The mirrors disappeared while waiting
    MirrorsGone { polls: u32 },
    /// Re-listing the mirrors failed
    ListFailed { polls: u32 },
    /// Mirrors were still busy at the deadline
    TimedOut { polls: u32 },
}

/// Updates the SVM root volume's load-sharing mirrors and waits for them
#[derive(Debug, Clone)]
pub struct MirrorSyncWaiter {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for MirrorSyncWaiter {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(LS_MIRROR_IDLE_TIMEOUT_SECS),
        }
    }
}

impl MirrorSyncWaiter {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Trigger a mirror update and block until the mirrors settle
    pub async fn update_load_sharing_mirrors(&self, api: &dyn OntapApi) -> MirrorSyncOutcome {
        let root_volume = match api.root_volume_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!("Error getting SVM root volume. {}", e);
                return MirrorSyncOutcome::RootVolumeUnavailable;
            }
        };

        let mirrors = match api.load_sharing_mirrors(&root_volume).await {
            Ok(mirrors) => mirrors,
            Err(e) => {
                warn!("Error getting load-sharing mirrors for SVM root volume. {}", e);
                return MirrorSyncOutcome::NoMirrors;
            }
        };
        let Some(first) = mirrors.first() else {
            debug!(root_volume = %root_volume, "SVM root volume has no load-sharing mirrors.");
            return MirrorSyncOutcome::NoMirrors;
        };

        if let Err(e) = api.update_load_sharing_mirrors(&first.source_location).await {
            warn!("Error updating load-sharing mirrors for SVM root volume. {}", e);
            return MirrorSyncOutcome::UpdateFailed;
        }

        let deadline = Instant::now() + self.timeout;
        let mut polls = 0;

        loop {
            tokio::time::sleep(self.poll_interval).await;
            polls += 1;
            debug!(polls, "Load-sharing mirrors not yet idle, polling...");

            let mirrors = match api.load_sharing_mirrors(&root_volume).await {
                Ok(mirrors) => mirrors,
                Err(e) => {
                    warn!("Error getting load-sharing mirrors for SVM root volume. {}", e);
                    return MirrorSyncOutcome::ListFailed { polls };
                }
            };

            if mirrors.is_empty() {
                debug!(root_volume = %root_volume, "SVM root volume has no load-sharing mirrors.");
                return MirrorSyncOutcome::MirrorsGone { polls };
            }

            if mirrors.iter().all(|m| m.is_idle()) {
                debug!(polls, "Load-sharing mirrors idle.");
                return MirrorSyncOutcome::Idle { polls };
            }

            if Instant::now() > deadline {
                warn!(polls, "Load-sharing mirrors not yet idle, giving up.");
                return MirrorSyncOutcome::TimedOut { polls };
            }
        }
    }
}
