//! Media Discovery Strategies
//!
//! Aggregate media types can be read two ways: through the SVM-scoped
//! aggregate listing (ONTAP 9 and later) or through the cluster-scoped one,
//! which needs cluster privileges. Both return the same records and are
//! applied to the pools identically.

use super::pool::{CapacityPool, Media};
use crate::domain::ports::{AggregateAttributes, ApiResult, Feature, OntapApi};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Source of aggregate media types
#[async_trait]
pub trait MediaStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read aggregate attributes from the cluster
    async fn aggregate_attributes(&self, api: &dyn OntapApi) -> ApiResult<Vec<AggregateAttributes>>;
}

/// Reads aggregates as seen by the SVM
#[derive(Debug, Clone, Copy, Default)]
pub struct SvmScopedStrategy;

#[async_trait]
impl MediaStrategy for SvmScopedStrategy {
    fn name(&self) -> &'static str {
        "svm-scoped"
    }

    async fn aggregate_attributes(&self, api: &dyn OntapApi) -> ApiResult<Vec<AggregateAttributes>> {
        api.svm_aggregate_attributes().await
    }
}

/// Reads aggregates at cluster scope
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterScopedStrategy;

#[async_trait]
impl MediaStrategy for ClusterScopedStrategy {
    fn name(&self) -> &'static str {
        "cluster-scoped"
    }

    async fn aggregate_attributes(&self, api: &dyn OntapApi) -> ApiResult<Vec<AggregateAttributes>> {
        api.cluster_aggregate_attributes().await
    }
}

/// Pick the best strategy the cluster supports
pub fn select_media_strategy(api: &dyn OntapApi) -> Box<dyn MediaStrategy> {
    if api.supports_feature(Feature::VserverShowAggr) {
        Box::new(SvmScopedStrategy)
    } else {
        Box::new(ClusterScopedStrategy)
    }
}

/// Aggregate whose type is outside the known media classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMedia {
    pub aggregate: String,
    pub media_type: String,
}

/// Annotate pools with the media class of their aggregates
///
/// The listing may include aggregates that are not pooled; those are ignored.
/// Unknown types leave the pool without a media offer.
pub async fn apply_media_attributes(
    strategy: &dyn MediaStrategy,
    api: &dyn OntapApi,
    pools: &mut BTreeMap<String, CapacityPool>,
) -> ApiResult<Vec<UnknownMedia>> {
    let aggregates = strategy.aggregate_attributes(api).await?;
    let mut unknown = Vec::new();

    for aggregate in aggregates {
        let Some(pool) = pools.get_mut(&aggregate.name) else {
            continue;
        };

        let Some(media) = Media::from_aggregate_type(&aggregate.aggregate_type) else {
            warn!(
                aggregate = %aggregate.name,
                media_type = %aggregate.aggregate_type,
                "Aggregate has unknown media type."
            );
            unknown.push(UnknownMedia {
                aggregate: aggregate.name,
                media_type: aggregate.aggregate_type,
            });
            continue;
        };

        debug!(
            aggregate = %aggregate.name,
            media_type = %media,
            strategy = strategy.name(),
            "Read aggregate attributes."
        );
        pool.merge_attributes(&media.offers());
    }

    Ok(unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::AggregateAttributes;
    use crate::testing::FakeOntapApi;

    fn pools(names: &[&str]) -> BTreeMap<String, CapacityPool> {
        names
            .iter()
            .map(|n| (n.to_string(), CapacityPool::new("backend", *n)))
            .collect()
    }

    #[test]
    fn test_strategy_selection() {
        let api = FakeOntapApi::new();
        assert_eq!(select_media_strategy(api.as_ref()).name(), "svm-scoped");

        let api = FakeOntapApi::with(|s| {
            s.features.remove(&Feature::VserverShowAggr);
        });
        assert_eq!(select_media_strategy(api.as_ref()).name(), "cluster-scoped");
    }

    #[tokio::test]
    async fn test_svm_strategy_annotates_pools() {
        let api = FakeOntapApi::new();
        let mut pools = pools(&["aggr1", "aggr2"]);

        let unknown = apply_media_attributes(&SvmScopedStrategy, api.as_ref(), &mut pools)
            .await
            .unwrap();

        assert!(unknown.is_empty());
        assert_eq!(pools["aggr1"].media(), Some(Media::Hdd));
        assert_eq!(pools["aggr2"].media(), Some(Media::Ssd));
        assert_eq!(api.call_count("cluster_aggregate_attributes"), 0);
    }

    #[tokio::test]
    async fn test_cluster_strategy_ignores_unpooled_and_unknown() {
        let api = FakeOntapApi::with(|s| {
            s.cluster_aggregate_attributes = Ok(vec![
                AggregateAttributes::new("aggr0_node1", "ssd"),
                AggregateAttributes::new("aggr1", "hybrid"),
                AggregateAttributes::new("aggr2", "flexgroup"),
            ]);
        });
        let mut pools = pools(&["aggr1", "aggr2"]);

        let unknown = apply_media_attributes(&ClusterScopedStrategy, api.as_ref(), &mut pools)
            .await
            .unwrap();

        assert_eq!(pools.len(), 2);
        assert_eq!(pools["aggr1"].media(), Some(Media::Hybrid));
        assert_eq!(pools["aggr2"].media(), None);
        assert_eq!(
            unknown,
            vec![UnknownMedia {
                aggregate: "aggr2".into(),
                media_type: "flexgroup".into()
            }]
        );
    }
}
