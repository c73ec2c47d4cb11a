//! ONTAP Driver
//!
//! Startup sequence shared by the ONTAP drivers and the [`OntapDriver`]
//! handle that ties the backend's configuration, API client, heartbeat and
//! per-operation workflows together.

pub mod endpoint;

pub use endpoint::*;

use crate::config::{parse_bool, BackendConfig, DriverKind, OrchestratorContext};
use crate::discovery::{attr, discover_storage_pools, DiscoveryReport, Offer};
use crate::domain::ports::{
    AddressResolver, ApiClientFactory, Feature, MountExecutorRef, OntapApi, OntapApiRef,
};
use crate::error::{Error, Result};
use crate::mirror::{MirrorSyncOutcome, MirrorSyncWaiter};
use crate::telemetry::{Heartbeat, Telemetry};
use crate::volume::{create_clone, CloneOutcome, CloneRequest, VolumeConfig};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// =============================================================================
// Initialization
// =============================================================================

/// Connect to the cluster and finish the backend config
///
/// Fails if the management LIF does not resolve, the SVM cannot be derived,
/// or the cluster is older than the minimum supported ONTAPI version.
pub async fn initialize_driver(
    config: &mut BackendConfig,
    driver: DriverKind,
    factory: &dyn ApiClientFactory,
    resolver: &dyn AddressResolver,
) -> Result<OntapApiRef> {
    resolve_management_lif(config, resolver).await?;

    let api = initialize_api(config, factory).await?;

    let ontapi = api.ontapi_version().await?;
    if !api.supports_feature(Feature::MinimumOntapiVersion) {
        return Err(Error::UnsupportedVersion(format!(
            "ONTAPI {} found, ONTAP 8.3 or later is required",
            ontapi
        )));
    }
    debug!(ontapi = %ontapi, "ONTAP API version.");

    match api.node_serial_numbers().await {
        Ok(serial_numbers) => {
            info!(serial_numbers = %serial_numbers.join(","), "Controller serial numbers.");
            config.serial_numbers = serial_numbers;
        }
        Err(e) => warn!("Could not determine controller serial numbers. {}", e),
    }

    config.populate_defaults(driver)?;

    Ok(api)
}

/// Offers every pool of `driver` makes regardless of media
pub fn common_attributes(driver: DriverKind, api: &dyn OntapApi) -> BTreeMap<String, Offer> {
    let volume_level = driver != DriverKind::OntapNasEconomy;

    BTreeMap::from([
        (attr::BACKEND_TYPE.to_string(), Offer::string(driver.name())),
        (attr::SNAPSHOTS.to_string(), Offer::Bool(volume_level)),
        (attr::CLONES.to_string(), Offer::Bool(volume_level)),
        (
            attr::ENCRYPTION.to_string(),
            Offer::Bool(api.supports_feature(Feature::NetAppVolumeEncryption)),
        ),
        (
            attr::PROVISIONING_TYPE.to_string(),
            Offer::strings(["thick", "thin"]),
        ),
    ])
}

// =============================================================================
// Driver
// =============================================================================

/// An initialized ONTAP backend
pub struct OntapDriver {
    kind: DriverKind,
    config: BackendConfig,
    api: OntapApiRef,
    orchestrator: OrchestratorContext,
    mounter: MountExecutorRef,
    mirror_waiter: MirrorSyncWaiter,
    heartbeat: Heartbeat,
}

impl OntapDriver {
    /// Initialize a backend and start its heartbeat
    pub async fn initialize(
        kind: DriverKind,
        mut config: BackendConfig,
        orchestrator: OrchestratorContext,
        factory: &dyn ApiClientFactory,
        resolver: &dyn AddressResolver,
        mounter: MountExecutorRef,
    ) -> Result<Self> {
        let api = initialize_driver(&mut config, kind, factory, resolver).await?;

        if kind.is_nas() {
            validate_nas_driver(api.as_ref(), &mut config, resolver).await?;
        }

        if config.backend_name.is_empty() {
            config.backend_name = default_backend_name(kind, &config);
        }

        let telemetry = Telemetry::new(&orchestrator, kind, &config);
        let heartbeat = Heartbeat::new(api.clone(), telemetry, &config.usage_heartbeat);
        heartbeat.start();

        info!(
            driver = %kind,
            backend = %config.backend_name,
            svm = %config.svm,
            "Initialized ONTAP backend."
        );

        Ok(Self {
            kind,
            config,
            api,
            orchestrator,
            mounter,
            mirror_waiter: MirrorSyncWaiter::default(),
            heartbeat,
        })
    }

    pub fn kind(&self) -> DriverKind {
        self.kind
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn api(&self) -> &OntapApiRef {
        &self.api
    }

    pub fn orchestrator(&self) -> &OrchestratorContext {
        &self.orchestrator
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    /// Discover the backend's capacity pools
    pub async fn storage_pools(&self) -> Result<DiscoveryReport> {
        let common = common_attributes(self.kind, self.api.as_ref());
        discover_storage_pools(
            self.api.as_ref(),
            &self.config,
            &self.config.backend_name,
            &common,
        )
        .await
    }

    /// Clone a volume as described by a prepared volume config
    ///
    /// Junction-mounted clones are followed by a load-sharing mirror update so
    /// the new junction is visible through the mirrors.
    pub async fn create_clone(&self, volume_config: &VolumeConfig) -> Result<CloneOutcome> {
        let split = if volume_config.split_on_clone.is_empty() {
            self.config.split_on_clone_enabled()?
        } else {
            parse_bool(&volume_config.split_on_clone).map_err(|e| {
                Error::Config(format!("invalid boolean value for splitOnClone: {}", e))
            })?
        };

        let snapshot = Some(volume_config.clone_source_snapshot.clone()).filter(|s| !s.is_empty());

        let request = CloneRequest {
            name: volume_config.internal_name.clone(),
            source: volume_config.clone_source_volume_internal.clone(),
            snapshot,
            split,
        };

        let outcome = create_clone(self.api.as_ref(), self.kind, &request).await?;

        if outcome.junction.is_some() {
            self.update_mirrors().await;
        }

        Ok(outcome)
    }

    /// Update the SVM root volume's load-sharing mirrors and wait for them
    pub async fn update_mirrors(&self) -> MirrorSyncOutcome {
        self.mirror_waiter
            .update_load_sharing_mirrors(self.api.as_ref())
            .await
    }

    /// Mount an export of this backend on the local host
    pub async fn mount(&self, export_path: &str, mountpoint: &str) -> Result<()> {
        self.mounter
            .mount(export_path, mountpoint, &self.config.nfs_mount_options)
            .await
    }

    pub async fn unmount(&self, mountpoint: &str) -> Result<()> {
        self.mounter.unmount(mountpoint).await
    }

    /// Stop background work; later calls do nothing
    pub async fn terminate(&self) {
        let Some(handle) = self.heartbeat.stop() else {
            return;
        };

        if let Err(e) = handle.await {
            warn!(driver = %self.kind, "EMS heartbeat task ended abnormally. {}", e);
        }
        info!(driver = %self.kind, backend = %self.config.backend_name, "Terminated ONTAP backend.");
    }
}

fn default_backend_name(kind: DriverKind, config: &BackendConfig) -> String {
    let lif = if kind.is_nas() {
        &config.data_lif
    } else {
        &config.management_lif
    };
    format!("{}_{}", kind.name().replace('-', ""), lif)
}
