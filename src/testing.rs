//! Scripted collaborators for unit tests

use crate::domain::ports::{
    AddressResolver, AggregateAttributes, ApiClientFactory, ApiResult, ClientConfig, EmsMessage,
    Feature, MirrorRelationship, MountExecutor, OntapApi, OntapApiRef, SnapshotAttributes,
};
use crate::error::{ApiError, Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;

/// Canned replies and recorded calls of a [`FakeOntapApi`]
pub struct FakeState {
    pub features: HashSet<Feature>,
    pub ontapi_version: ApiResult<String>,
    pub serial_numbers: ApiResult<Vec<String>>,
    pub svms: ApiResult<Vec<String>>,
    pub data_lifs: ApiResult<Vec<String>>,
    pub aggregates: ApiResult<Vec<String>>,
    pub svm_aggregate_attributes: ApiResult<Vec<AggregateAttributes>>,
    pub cluster_aggregate_attributes: ApiResult<Vec<AggregateAttributes>>,
    /// Panic inside `svm_aggregate_names` with this message
    pub aggregate_panic: Option<String>,
    pub volumes: Vec<String>,
    pub volume_exists_error: Option<ApiError>,
    pub snapshot_error: Option<ApiError>,
    pub clone_error: Option<ApiError>,
    pub mount_error: Option<ApiError>,
    pub split_error: Option<ApiError>,
    pub snapshots: ApiResult<Vec<SnapshotAttributes>>,
    pub root_volume: ApiResult<String>,
    /// Replies to successive mirror listings; the last one repeats
    pub mirrors: VecDeque<ApiResult<Vec<MirrorRelationship>>>,
    pub mirror_update_error: Option<ApiError>,
    pub ems_error: Option<ApiError>,
    pub ems_messages: Vec<EmsMessage>,
    pub calls: Vec<String>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            features: [
                Feature::MinimumOntapiVersion,
                Feature::VserverShowAggr,
                Feature::NetAppVolumeEncryption,
            ]
            .into_iter()
            .collect(),
            ontapi_version: Ok("1.150".into()),
            serial_numbers: Ok(vec!["4082368507".into()]),
            svms: Ok(vec!["svm0".into()]),
            data_lifs: Ok(vec!["10.0.0.10".into(), "10.0.0.11".into()]),
            aggregates: Ok(vec!["aggr1".into(), "aggr2".into()]),
            svm_aggregate_attributes: Ok(vec![
                AggregateAttributes::new("aggr1", "hdd"),
                AggregateAttributes::new("aggr2", "ssd"),
            ]),
            cluster_aggregate_attributes: Ok(vec![
                AggregateAttributes::new("aggr1", "hybrid"),
                AggregateAttributes::new("aggr2", "ssd"),
            ]),
            aggregate_panic: None,
            volumes: vec!["trident_source".into()],
            volume_exists_error: None,
            snapshot_error: None,
            clone_error: None,
            mount_error: None,
            split_error: None,
            snapshots: Ok(Vec::new()),
            root_volume: Ok("svm0_root".into()),
            mirrors: VecDeque::new(),
            mirror_update_error: None,
            ems_error: None,
            ems_messages: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// In-memory management API with scripted replies
#[derive(Default)]
pub struct FakeOntapApi {
    state: Mutex<FakeState>,
}

impl FakeOntapApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build a fake after adjusting its default replies
    pub fn with(configure: impl FnOnce(&mut FakeState)) -> Arc<Self> {
        let fake = Self::default();
        configure(&mut fake.state.lock());
        Arc::new(fake)
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, FakeState> {
        self.state.lock()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls whose name starts with `prefix`
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) -> parking_lot::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state
    }
}

fn fail_or(error: &Option<ApiError>) -> ApiResult<()> {
    match error {
        Some(e) => Err(e.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl OntapApi for FakeOntapApi {
    async fn ontapi_version(&self) -> ApiResult<String> {
        self.record("ontapi_version".into()).ontapi_version.clone()
    }

    fn supports_feature(&self, feature: Feature) -> bool {
        self.state.lock().features.contains(&feature)
    }

    async fn node_serial_numbers(&self) -> ApiResult<Vec<String>> {
        self.record("node_serial_numbers".into()).serial_numbers.clone()
    }

    async fn svm_names(&self) -> ApiResult<Vec<String>> {
        self.record("svm_names".into()).svms.clone()
    }

    async fn data_lifs(&self, protocol: &str) -> ApiResult<Vec<String>> {
        self.record(format!("data_lifs {}", protocol)).data_lifs.clone()
    }

    async fn svm_aggregate_names(&self) -> ApiResult<Vec<String>> {
        let state = self.record("svm_aggregate_names".into());
        if let Some(message) = state.aggregate_panic.clone() {
            drop(state);
            panic!("{}", message);
        }
        state.aggregates.clone()
    }

    async fn svm_aggregate_attributes(&self) -> ApiResult<Vec<AggregateAttributes>> {
        self.record("svm_aggregate_attributes".into())
            .svm_aggregate_attributes
            .clone()
    }

    async fn cluster_aggregate_attributes(&self) -> ApiResult<Vec<AggregateAttributes>> {
        self.record("cluster_aggregate_attributes".into())
            .cluster_aggregate_attributes
            .clone()
    }

    async fn volume_exists(&self, name: &str) -> ApiResult<bool> {
        let state = self.record(format!("volume_exists {}", name));
        match &state.volume_exists_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.volumes.iter().any(|v| v == name)),
        }
    }

    async fn volume_list(&self, prefix: &str) -> ApiResult<Vec<String>> {
        let state = self.record(format!("volume_list {}", prefix));
        Ok(state
            .volumes
            .iter()
            .filter(|v| v.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn volume_mount(&self, name: &str, junction_path: &str) -> ApiResult<()> {
        fail_or(&self.record(format!("volume_mount {} {}", name, junction_path)).mount_error)
    }

    async fn volume_clone_create(&self, name: &str, source: &str, snapshot: &str) -> ApiResult<()> {
        let mut state = self.record(format!("volume_clone_create {} {} {}", name, source, snapshot));
        fail_or(&state.clone_error)?;
        state.volumes.push(name.to_string());
        Ok(())
    }

    async fn volume_clone_split_start(&self, name: &str) -> ApiResult<()> {
        fail_or(&self.record(format!("volume_clone_split_start {}", name)).split_error)
    }

    async fn snapshot_create(&self, snapshot: &str, volume: &str) -> ApiResult<()> {
        fail_or(&self.record(format!("snapshot_create {} {}", snapshot, volume)).snapshot_error)
    }

    async fn snapshots_by_volume(&self, volume: &str) -> ApiResult<Vec<SnapshotAttributes>> {
        self.record(format!("snapshots_by_volume {}", volume)).snapshots.clone()
    }

    async fn root_volume_name(&self) -> ApiResult<String> {
        self.record("root_volume_name".into()).root_volume.clone()
    }

    async fn load_sharing_mirrors(&self, volume: &str) -> ApiResult<Vec<MirrorRelationship>> {
        let mut state = self.record(format!("load_sharing_mirrors {}", volume));
        if state.mirrors.len() > 1 {
            state.mirrors.pop_front().unwrap_or(Ok(Vec::new()))
        } else {
            state.mirrors.front().cloned().unwrap_or(Ok(Vec::new()))
        }
    }

    async fn update_load_sharing_mirrors(&self, source_location: &str) -> ApiResult<()> {
        fail_or(
            &self
                .record(format!("update_load_sharing_mirrors {}", source_location))
                .mirror_update_error,
        )
    }

    async fn ems_autosupport_log(&self, message: EmsMessage) -> ApiResult<()> {
        let mut state = self.record("ems_autosupport_log".into());
        fail_or(&state.ems_error)?;
        state.ems_messages.push(message);
        Ok(())
    }
}

/// Hands out the same fake for every connection and remembers the configs
pub struct FakeClientFactory {
    pub api: Arc<FakeOntapApi>,
    pub connections: Mutex<Vec<ClientConfig>>,
}

impl FakeClientFactory {
    pub fn new(api: Arc<FakeOntapApi>) -> Self {
        Self {
            api,
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn connections(&self) -> Vec<ClientConfig> {
        self.connections.lock().clone()
    }
}

impl ApiClientFactory for FakeClientFactory {
    fn connect(&self, config: &ClientConfig) -> Result<OntapApiRef> {
        self.connections.lock().push(config.clone());
        Ok(self.api.clone())
    }
}

/// Resolves literal addresses and a fixed table of hostnames
#[derive(Default)]
pub struct FakeResolver {
    hosts: BTreeMap<String, Vec<IpAddr>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, addresses: &[&str]) -> Self {
        let parsed = addresses
            .iter()
            .map(|a| a.parse().expect("test address must parse"))
            .collect();
        self.hosts.insert(host.to_string(), parsed);
        self
    }
}

#[async_trait]
impl AddressResolver for FakeResolver {
    async fn lookup_host(&self, host: &str) -> std::io::Result<Vec<IpAddr>> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        self.hosts.get(host).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such host {}", host))
        })
    }
}

/// Records local mount requests
#[derive(Default)]
pub struct FakeMounter {
    pub mounts: Mutex<Vec<(String, String, String)>>,
    pub unmounts: Mutex<Vec<String>>,
}

#[async_trait]
impl MountExecutor for FakeMounter {
    async fn mount(&self, export_path: &str, mountpoint: &str, options: &str) -> Result<()> {
        self.mounts.lock().push((
            export_path.to_string(),
            mountpoint.to_string(),
            options.to_string(),
        ));
        Ok(())
    }

    async fn unmount(&self, mountpoint: &str) -> Result<()> {
        if mountpoint.is_empty() {
            return Err(Error::LocalMount {
                operation: "unmounting".into(),
                mountpoint: mountpoint.into(),
                reason: "empty mountpoint".into(),
            });
        }
        self.unmounts.lock().push(mountpoint.to_string());
        Ok(())
    }
}
