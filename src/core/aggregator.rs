use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use validator::Validate;

use crate::core::assembler::{region_performance, Assembly, ResponseAssembler};
use crate::core::catalog::RegionCatalog;
use crate::core::collector::ResultCollector;
use crate::core::dedup::{deduplicate_outcomes, DedupStrategy};
use crate::core::dispatcher::RegionDispatcher;
use crate::core::merge::{merge, MergeStrategy};
use crate::core::quality::QualityAssessor;
use crate::models::{AggregateResponse, HealthStatus, SearchRequest};
use crate::services::{AnalyticsSink, OutcomeCache, RegionBackend, RegionDirectory};

/// Read-only engine configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub max_parallel_regions: usize,
    pub default_timeout_ms: u64,
    pub caching_enabled: bool,
    pub cache_ttl_secs: u64,
    /// Reserved for fuzzy name matching
    pub dedup_similarity_threshold: f64,
    pub default_region: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_parallel_regions: 3,
            default_timeout_ms: 10_000,
            caching_enabled: true,
            cache_ttl_secs: 300,
            dedup_similarity_threshold: 0.85,
            default_region: "global".to_string(),
        }
    }
}

/// Errors surfaced to the caller of the aggregation entry point
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Multi-region search orchestrator
///
/// # Pipeline Stages
/// 1. Region selection
/// 2. Concurrent dispatch, one task per region
/// 3. Collection under the response-time budget
/// 4. Cross-region deduplication in dispatch order, then merge
/// 5. Quality assessment
/// 6. Response assembly
///
/// Regional failures and timeouts never fail the request; they are reported
/// in the performance breakdown.
#[derive(Clone)]
pub struct MultiRegionAggregator {
    catalog: RegionCatalog,
    dispatcher: RegionDispatcher,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    assessor: QualityAssessor,
    config: AggregatorConfig,
}

impl MultiRegionAggregator {
    pub fn new(
        directory: Arc<dyn RegionDirectory>,
        backend: Arc<dyn RegionBackend>,
        cache: Option<Arc<dyn OutcomeCache>>,
        analytics: Option<Arc<dyn AnalyticsSink>>,
        config: AggregatorConfig,
    ) -> Self {
        let cache = if config.caching_enabled { cache } else { None };
        let catalog = RegionCatalog::new(directory, config.max_parallel_regions, config.default_region.clone());
        let dispatcher = RegionDispatcher::new(backend, cache, Duration::from_secs(config.cache_ttl_secs));

        Self {
            catalog,
            dispatcher,
            analytics,
            assessor: QualityAssessor::default(),
            config,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Execute a search across every selected region and merge the results
    ///
    /// Only an invalid request returns an error. A merge failure yields an
    /// empty response carrying an error marker.
    pub async fn execute_multi_region_search(
        &self,
        mut request: SearchRequest,
    ) -> Result<AggregateResponse, AggregationError> {
        request.validate()?;

        let started = Instant::now();
        let request_id = request
            .request_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();
        let request = Arc::new(request);

        // Stage 1: region selection
        let regions = self.catalog.select_regions(&request);
        let budget = Duration::from_millis(
            request
                .cross_region
                .response_time_budget_ms
                .unwrap_or(self.config.default_timeout_ms),
        );
        tracing::info!(
            "Request {} dispatching to {} regions with {}ms budget",
            request_id,
            regions.len(),
            budget.as_millis()
        );

        // Stages 2 & 3: dispatch and collect
        let collector = ResultCollector::new(budget);
        let deadline = collector.deadline_from_now();
        let pending = self.dispatcher.dispatch(Arc::clone(&request), regions);
        let outcomes = collector.collect(pending, deadline).await;
        let dispatched = outcomes.len();

        // Stage 4: dedup in dispatch order, then merge the survivors
        let total_before_merging: usize = outcomes.iter().map(|o| o.items.len()).sum();
        let mut survivors = outcomes.clone();
        let (duplicates_removed, dedup_strategy) = if request.cross_region.dedup_enabled {
            let strategy = DedupStrategy::from_name(request.cross_region.dedup_strategy.as_deref());
            (deduplicate_outcomes(&mut survivors, strategy), Some(strategy))
        } else {
            (0, None)
        };

        let merge_strategy = MergeStrategy::from_name(request.cross_region.merge_strategy.as_deref());
        let items = match merge(
            &survivors,
            merge_strategy,
            &request.cross_region.region_weights,
            request.reference_point(),
        ) {
            Ok(merged) => merged.items,
            Err(e) => {
                tracing::error!("Request {} merge failed: {}", request_id, e);
                let mut response = AggregateResponse::empty(request_id, request.effective_page_size(), e.to_string());
                response.regions_queried = outcomes.iter().map(|o| o.region_id.clone()).collect();
                response.performance = region_performance(&outcomes);
                response.performance.overall_health = HealthStatus::Unhealthy;
                self.record_analytics(&request, &response, started);
                return Ok(response);
            }
        };

        // Stage 5: quality over the full merged set
        let quality = self
            .assessor
            .assess(&items, dispatched, request.geo.bounding_box.as_ref());

        // Stage 6: assembly
        let response = ResponseAssembler.assemble(Assembly {
            request_id,
            outcomes,
            items,
            merge_strategy,
            dedup_strategy,
            total_before_merging,
            duplicates_removed,
            quality,
            page: request.page,
            page_size: request.effective_page_size(),
        });

        tracing::info!(
            "Request {} completed: {} results from {} regions ({:?}) in {}ms",
            response.request_id,
            response.merging_info.total_results_after_merging,
            dispatched,
            response.performance.overall_health,
            started.elapsed().as_millis()
        );

        self.record_analytics(&request, &response, started);
        Ok(response)
    }

    /// Hand the finished search to the analytics sink without waiting on it
    fn record_analytics(&self, request: &Arc<SearchRequest>, response: &AggregateResponse, started: Instant) {
        let Some(sink) = self.analytics.clone() else {
            return;
        };
        let request = Arc::clone(request);
        let response = response.clone();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        tokio::spawn(async move {
            if let Err(e) = sink.record(&request, &response, elapsed_ms).await {
                tracing::warn!("Failed to record analytics for {}: {}", response.request_id, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutcomeStatus, RegionQuery, ResultItem};
    use crate::services::{AnalyticsError, BackendError, RegionDefinition, StaticRegionRegistry};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        items: BTreeMap<&'static str, Vec<ResultItem>>,
    }

    #[async_trait]
    impl RegionBackend for FixedBackend {
        async fn search(&self, query: &RegionQuery) -> Result<Vec<ResultItem>, BackendError> {
            self.items
                .get(query.region_id.as_str())
                .cloned()
                .ok_or_else(|| BackendError::UnknownRegion(query.region_id.clone()))
        }
    }

    struct CountingSink {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AnalyticsSink for CountingSink {
        async fn record(&self, _: &SearchRequest, _: &AggregateResponse, _: u64) -> Result<(), AnalyticsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AnalyticsError::Unavailable("sink offline".into()))
        }
    }

    fn item(id: &str, relevance: f64) -> ResultItem {
        ResultItem {
            id: id.to_string(),
            name: format!("Hotel {}", id),
            relevance_score: relevance,
            latitude: None,
            longitude: None,
            updated_at: None,
            source_region: None,
        }
    }

    fn definition(id: &str, priority: f64) -> RegionDefinition {
        RegionDefinition {
            id: id.to_string(),
            name: id.to_uppercase(),
            countries: vec!["VN".to_string()],
            destinations: vec!["Hanoi".to_string()],
            bounds: None,
            center: None,
            radius_km: None,
            priority,
            healthy: true,
        }
    }

    fn aggregator(analytics: Option<Arc<dyn AnalyticsSink>>) -> MultiRegionAggregator {
        let registry = Arc::new(StaticRegionRegistry::new(vec![definition("a", 3.0), definition("b", 2.0)]));
        let backend = Arc::new(FixedBackend {
            items: BTreeMap::from([
                ("a", vec![item("x", 0.9), item("y", 0.5)]),
                ("b", vec![item("x", 0.8), item("z", 0.7)]),
            ]),
        });
        MultiRegionAggregator::new(registry, backend, None, analytics, AggregatorConfig::default())
    }

    fn request() -> SearchRequest {
        SearchRequest {
            destination: Some("Hanoi".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pipeline_merges_and_dedups() {
        let response = aggregator(None).execute_multi_region_search(request()).await.unwrap();

        assert_eq!(response.regions_queried, vec!["a", "b"]);
        assert_eq!(response.merging_info.strategy, "weighted");
        assert_eq!(response.merging_info.total_results_before_merging, 4);
        assert_eq!(response.merging_info.duplicates_removed, 1);
        assert_eq!(response.merging_info.total_results_after_merging, 3);
        assert_eq!(response.performance.overall_health, HealthStatus::Healthy);
        assert!(uuid::Uuid::parse_str(&response.request_id).is_ok());

        let survivor = response.results.iter().find(|i| i.id == "x").unwrap();
        assert_eq!(survivor.source_region.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_request_id_is_preserved() {
        let mut req = request();
        req.request_id = Some("req-42".to_string());
        let response = aggregator(None).execute_multi_region_search(req).await.unwrap();
        assert_eq!(response.request_id, "req-42");
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let result = aggregator(None).execute_multi_region_search(SearchRequest::default()).await;
        assert!(matches!(result, Err(AggregationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_dedup_disabled_keeps_duplicates() {
        let mut req = request();
        req.cross_region.dedup_enabled = false;
        let response = aggregator(None).execute_multi_region_search(req).await.unwrap();

        assert_eq!(response.merging_info.duplicates_removed, 0);
        assert!(response.merging_info.dedup_strategy.is_none());
        assert_eq!(response.results.len(), 4);
    }

    #[tokio::test]
    async fn test_merge_failure_returns_marked_empty_response() {
        let registry = Arc::new(StaticRegionRegistry::new(vec![definition("a", 3.0), definition("b", 2.0)]));
        let backend = Arc::new(FixedBackend {
            items: BTreeMap::from([("a", vec![item("x", 0.9)]), ("b", vec![item("w", f64::NAN)])]),
        });
        let engine = MultiRegionAggregator::new(registry, backend, None, None, AggregatorConfig::default());

        let response = engine.execute_multi_region_search(request()).await.unwrap();

        assert!(response.results.is_empty());
        assert!(response.error.is_some());
        assert_eq!(response.performance.overall_health, HealthStatus::Unhealthy);

        // Per-region outcomes survive the failed merge
        assert_eq!(response.regions_queried, vec!["a", "b"]);
        assert_eq!(response.performance.regions.len(), 2);
        assert_eq!(response.performance.successful_regions, 2);
        assert_eq!(response.performance.regions[1].result_count, 1);
    }

    #[tokio::test]
    async fn test_overflowing_region_weight_rejected_before_dispatch() {
        let mut req = request();
        req.cross_region.region_weights.insert("a".to_string(), f64::MAX);
        let result = aggregator(None).execute_multi_region_search(req).await;
        assert!(matches!(result, Err(AggregationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_default_region_reports_failure() {
        let registry = Arc::new(StaticRegionRegistry::new(vec![]));
        let backend = Arc::new(FixedBackend { items: BTreeMap::new() });
        let engine = MultiRegionAggregator::new(registry, backend, None, None, AggregatorConfig::default());

        let response = engine.execute_multi_region_search(request()).await.unwrap();

        assert_eq!(response.regions_queried, vec!["global"]);
        assert_eq!(response.performance.regions[0].status, OutcomeStatus::Failure);
        assert!(response.results.is_empty());
        assert_eq!(response.quality.overall_quality, 0.0);
    }

    #[tokio::test]
    async fn test_analytics_failure_does_not_affect_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let sink: Arc<dyn AnalyticsSink> = Arc::new(CountingSink { calls: Arc::clone(&calls) });
        let response = aggregator(Some(sink)).execute_multi_region_search(request()).await.unwrap();

        assert_eq!(response.merging_info.total_results_after_merging, 3);
        for _ in 0..10 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
