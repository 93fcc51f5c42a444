use crate::core::dedup::DedupStrategy;
use crate::core::merge::MergeStrategy;
use crate::models::{
    AggregateResponse, HealthStatus, MergingInfo, OutcomeStatus, Pagination, QualityMetrics,
    RegionMetrics, RegionOutcome, RegionPerformance, ResultItem,
};

/// Everything the assembler needs from the earlier stages
pub struct Assembly {
    pub request_id: String,
    pub outcomes: Vec<RegionOutcome>,
    pub items: Vec<ResultItem>,
    pub merge_strategy: MergeStrategy,
    /// `None` when deduplication was disabled
    pub dedup_strategy: Option<DedupStrategy>,
    pub total_before_merging: usize,
    pub duplicates_removed: usize,
    pub quality: QualityMetrics,
    pub page: u32,
    pub page_size: usize,
}

/// Packages merged results and statistics into the final response
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn assemble(&self, assembly: Assembly) -> AggregateResponse {
        let Assembly {
            request_id,
            outcomes,
            items,
            merge_strategy,
            dedup_strategy,
            total_before_merging,
            duplicates_removed,
            quality,
            page,
            page_size,
        } = assembly;

        let merging_info = MergingInfo {
            strategy: merge_strategy.name().to_string(),
            total_results_before_merging: total_before_merging,
            total_results_after_merging: items.len(),
            duplicates_removed,
            dedup_strategy: dedup_strategy.map(|s| s.name().to_string()),
            merging_confidence: merging_confidence(&outcomes),
        };

        let pagination = Pagination::new(page, page_size, items.len());
        let results = paginate(items, page, pagination.page_size);

        AggregateResponse {
            request_id,
            results,
            regions_queried: outcomes.iter().map(|o| o.region_id.clone()).collect(),
            performance: region_performance(&outcomes),
            merging_info,
            quality,
            pagination,
            generated_at: chrono::Utc::now(),
            error: None,
        }
    }
}

/// Fraction of dispatched regions that returned successfully
pub fn merging_confidence(outcomes: &[RegionOutcome]) -> f64 {
    if outcomes.is_empty() {
        return 0.0;
    }
    let successes = outcomes
        .iter()
        .filter(|o| o.status == OutcomeStatus::Success)
        .count();
    successes as f64 / outcomes.len() as f64
}

/// `HEALTHY` with no failed/timed-out regions, `UNHEALTHY` when all are
pub fn classify_health(outcomes: &[RegionOutcome]) -> HealthStatus {
    let degraded = outcomes.iter().filter(|o| o.status.is_degraded()).count();
    if outcomes.is_empty() || degraded == outcomes.len() {
        HealthStatus::Unhealthy
    } else if degraded == 0 {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}

pub fn region_performance(outcomes: &[RegionOutcome]) -> RegionPerformance {
    let regions: Vec<RegionMetrics> = outcomes
        .iter()
        .map(|o| RegionMetrics {
            region_id: o.region_id.clone(),
            region_name: o.region_name.clone(),
            status: o.status,
            response_time_ms: o.elapsed_ms,
            result_count: o.item_count,
            cache_hit: o.cache_hit,
            error: o.error.clone(),
        })
        .collect();

    let count_status = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
    let average_response_time_ms = if outcomes.is_empty() {
        0.0
    } else {
        outcomes.iter().map(|o| o.elapsed_ms as f64).sum::<f64>() / outcomes.len() as f64
    };

    RegionPerformance {
        regions,
        fastest_region_ms: outcomes.iter().map(|o| o.elapsed_ms).min(),
        slowest_region_ms: outcomes.iter().map(|o| o.elapsed_ms).max(),
        average_response_time_ms,
        successful_regions: count_status(OutcomeStatus::Success),
        failed_regions: count_status(OutcomeStatus::Failure),
        timed_out_regions: count_status(OutcomeStatus::Timeout),
        cache_hits: outcomes.iter().filter(|o| o.cache_hit).count(),
        overall_health: classify_health(outcomes),
    }
}

fn paginate(items: Vec<ResultItem>, page: u32, page_size: usize) -> Vec<ResultItem> {
    let start = (page.saturating_sub(1) as usize).saturating_mul(page_size);
    items.into_iter().skip(start).take(page_size).collect()
}
