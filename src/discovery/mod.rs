//! Pool Discovery
//!
//! Enumerates the aggregates assigned to the backend's SVM, turns them into
//! capacity pools, and annotates the pools with physical media attributes as
//! far as the backend's credentials allow.
//!
//! Missing media attributes never make a backend unusable: privilege and
//! lookup failures while reading aggregate types are reported as
//! [`DiscoveryWarning`]s next to the pools. Only an SVM without aggregates, a
//! misconfigured aggregate restriction, or a fault inside discovery itself
//! fails the call.

pub mod pool;
pub mod strategy;

pub use pool::*;
pub use strategy::*;

use crate::config::BackendConfig;
use crate::domain::ports::OntapApi;
use crate::error::{Error, Result};
use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, warn};

// =============================================================================
// Discovery Report
// =============================================================================

/// Non-fatal problems met while discovering pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    /// The user may not read aggregate attributes; pools have no media offers
    InsufficientPrivilege { username: String },
    /// Aggregate attributes could not be read; pools have no media offers
    AggregateInfoUnavailable { reason: String },
    /// An aggregate reported a type outside the known media classes
    UnknownMedia { aggregate: String, media_type: String },
}

/// Pools found for a backend
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub pools: BTreeMap<String, CapacityPool>,
    pub warnings: Vec<DiscoveryWarning>,
}

impl DiscoveryReport {
    /// Whether media attributes could be read at all
    pub fn media_available(&self) -> bool {
        !self.warnings.iter().any(|w| {
            matches!(
                w,
                DiscoveryWarning::InsufficientPrivilege { .. }
                    | DiscoveryWarning::AggregateInfoUnavailable { .. }
            )
        })
    }
}

// =============================================================================
// Discovery
// =============================================================================

/// Discover the backend's capacity pools
///
/// `common_attributes` are the offers every pool of the calling driver makes
/// regardless of media. A panic raised by the API layer while discovering is
/// converted into [`Error::DiscoveryFailed`].
pub async fn discover_storage_pools(
    api: &dyn OntapApi,
    config: &BackendConfig,
    backend_name: &str,
    common_attributes: &BTreeMap<String, Offer>,
) -> Result<DiscoveryReport> {
    AssertUnwindSafe(discover(api, config, backend_name, common_attributes))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(discovery_failed(payload)))
}

async fn discover(
    api: &dyn OntapApi,
    config: &BackendConfig,
    backend_name: &str,
    common_attributes: &BTreeMap<String, Offer>,
) -> Result<DiscoveryReport> {
    let svm_aggregates = api.svm_aggregate_names().await?;
    if svm_aggregates.is_empty() {
        return Err(Error::NoCapacity {
            svm: config.svm.clone(),
        });
    }

    debug!(svm = %config.svm, pools = ?svm_aggregates, "Read storage pools assigned to SVM.");

    let mut pools: BTreeMap<String, CapacityPool> = if config.aggregate.is_empty() {
        svm_aggregates
            .iter()
            .map(|name| (name.clone(), CapacityPool::new(backend_name, name.as_str())))
            .collect()
    } else {
        if !svm_aggregates.contains(&config.aggregate) {
            return Err(Error::AggregateNotAssigned {
                aggregate: config.aggregate.clone(),
                svm: config.svm.clone(),
            });
        }

        debug!(
            driver = %config.storage_driver_name,
            aggregate = %config.aggregate,
            "Provisioning will be restricted to the aggregate set in the backend config."
        );

        BTreeMap::from([(
            config.aggregate.clone(),
            CapacityPool::new(backend_name, config.aggregate.as_str()),
        )])
    };

    let mut warnings = Vec::new();
    let strategy = select_media_strategy(api);

    match apply_media_attributes(strategy.as_ref(), api, &mut pools).await {
        Ok(unknown) => {
            warnings.extend(unknown.into_iter().map(|u| DiscoveryWarning::UnknownMedia {
                aggregate: u.aggregate,
                media_type: u.media_type,
            }));
        }
        Err(e) if e.is_scope_error() => {
            warn!(
                username = %config.username,
                "User has insufficient privileges to obtain aggregate info. Storage classes with \
                 physical attributes such as 'media' will not match pools on this backend."
            );
            warnings.push(DiscoveryWarning::InsufficientPrivilege {
                username: config.username.clone(),
            });
        }
        Err(e) => {
            error!(
                "Could not obtain aggregate info; storage classes with physical attributes such as \
                 'media' will not match pools on this backend: {}.",
                e
            );
            warnings.push(DiscoveryWarning::AggregateInfoUnavailable {
                reason: e.to_string(),
            });
        }
    }

    for pool in pools.values_mut() {
        pool.merge_attributes(common_attributes);
    }

    Ok(DiscoveryReport { pools, warnings })
}

fn discovery_failed(payload: Box<dyn Any + Send>) -> Error {
    let reason = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };

    Error::DiscoveryFailed {
        reason,
        trace: Backtrace::force_capture().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Feature;
    use crate::error::{ApiError, EAPIPRIVILEGE};
    use crate::testing::FakeOntapApi;
    use assert_matches::assert_matches;

    fn config() -> BackendConfig {
        BackendConfig {
            svm: "svm0".into(),
            username: "vsadmin".into(),
            storage_driver_name: "ontap-nas".into(),
            ..Default::default()
        }
    }

    fn common() -> BTreeMap<String, Offer> {
        BTreeMap::from([
            (attr::BACKEND_TYPE.to_string(), Offer::string("ontap-nas")),
            (attr::SNAPSHOTS.to_string(), Offer::Bool(true)),
            (attr::CLONES.to_string(), Offer::Bool(true)),
        ])
    }

    #[tokio::test]
    async fn test_one_pool_per_aggregate() {
        let api = FakeOntapApi::with(|s| {
            s.aggregates = Ok(vec!["aggr1".into(), "aggr2".into(), "aggr3".into()]);
        });

        let report = discover_storage_pools(api.as_ref(), &config(), "nas0", &common())
            .await
            .unwrap();

        assert_eq!(report.pools.len(), 3);
        assert!(report.warnings.is_empty());
        assert_eq!(report.pools["aggr1"].media(), Some(Media::Hdd));
        assert_eq!(report.pools["aggr2"].media(), Some(Media::Ssd));
        assert_eq!(report.pools["aggr3"].media(), None);
        for pool in report.pools.values() {
            assert_eq!(pool.backend, "nas0");
            assert_eq!(pool.attributes.get(attr::SNAPSHOTS), Some(&Offer::Bool(true)));
            assert_eq!(
                pool.attributes.get(attr::BACKEND_TYPE),
                Some(&Offer::string("ontap-nas"))
            );
        }
    }

    #[tokio::test]
    async fn test_no_aggregates_is_fatal() {
        let api = FakeOntapApi::with(|s| s.aggregates = Ok(vec![]));
        let err = discover_storage_pools(api.as_ref(), &config(), "nas0", &common()).await;
        assert_matches!(err, Err(Error::NoCapacity { svm }) if svm == "svm0");
    }

    #[tokio::test]
    async fn test_aggregate_restriction() {
        let api = FakeOntapApi::new();

        let restricted = BackendConfig {
            aggregate: "aggr2".into(),
            ..config()
        };
        let report = discover_storage_pools(api.as_ref(), &restricted, "nas0", &common())
            .await
            .unwrap();
        assert_eq!(report.pools.keys().collect::<Vec<_>>(), vec!["aggr2"]);
        assert_eq!(report.pools["aggr2"].media(), Some(Media::Ssd));

        let unassigned = BackendConfig {
            aggregate: "aggr9".into(),
            ..config()
        };
        let err = discover_storage_pools(api.as_ref(), &unassigned, "nas0", &common()).await;
        assert_matches!(
            err,
            Err(Error::AggregateNotAssigned { aggregate, .. }) if aggregate == "aggr9"
        );
    }

    #[tokio::test]
    async fn test_privilege_error_downgraded_to_warning() {
        let api = FakeOntapApi::with(|s| {
            s.svm_aggregate_attributes =
                Err(ApiError::remote(EAPIPRIVILEGE, "Insufficient privileges"));
        });

        let report = discover_storage_pools(api.as_ref(), &config(), "nas0", &common())
            .await
            .unwrap();

        assert_eq!(report.pools.len(), 2);
        assert!(report.pools.values().all(|p| p.media().is_none()));
        assert!(report.pools.values().all(|p| p.attributes.len() == 3));
        assert_eq!(
            report.warnings,
            vec![DiscoveryWarning::InsufficientPrivilege {
                username: "vsadmin".into()
            }]
        );
        assert!(!report.media_available());
    }

    #[tokio::test]
    async fn test_other_lookup_failure_is_non_fatal() {
        let api = FakeOntapApi::with(|s| {
            s.features.remove(&Feature::VserverShowAggr);
            s.cluster_aggregate_attributes = Err(ApiError::Transport("timeout".into()));
        });

        let report = discover_storage_pools(api.as_ref(), &config(), "nas0", &common())
            .await
            .unwrap();

        assert_eq!(report.pools.len(), 2);
        assert_eq!(api.call_count("svm_aggregate_attributes"), 0);
        assert_matches!(
            report.warnings.as_slice(),
            [DiscoveryWarning::AggregateInfoUnavailable { .. }]
        );
    }

    #[tokio::test]
    async fn test_unknown_media_reported() {
        let api = FakeOntapApi::with(|s| {
            s.svm_aggregate_attributes = Ok(vec![
                crate::domain::ports::AggregateAttributes::new("aggr1", "capacity"),
                crate::domain::ports::AggregateAttributes::new("aggr2", "ssd"),
            ]);
        });

        let report = discover_storage_pools(api.as_ref(), &config(), "nas0", &common())
            .await
            .unwrap();

        assert!(report.media_available());
        assert_eq!(report.pools["aggr1"].media(), None);
        assert_eq!(report.pools["aggr2"].media(), Some(Media::Ssd));
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_panic_becomes_discovery_failed() {
        let api = FakeOntapApi::with(|s| {
            s.aggregate_panic = Some("malformed aggr-get-iter response".into());
        });

        let err = discover_storage_pools(api.as_ref(), &config(), "nas0", &common()).await;

        assert_matches!(
            err,
            Err(Error::DiscoveryFailed { reason, trace })
                if reason == "malformed aggr-get-iter response" && !trace.is_empty()
        );
    }
}
