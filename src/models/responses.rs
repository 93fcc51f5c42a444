use serde::{Deserialize, Serialize};
use crate::models::domain::{OutcomeStatus, ResultItem};

/// Response for a multi-region search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub results: Vec<ResultItem>,
    #[serde(rename = "regionsQueried")]
    pub regions_queried: Vec<String>,
    pub performance: RegionPerformance,
    #[serde(rename = "mergingInfo")]
    pub merging_info: MergingInfo,
    #[serde(rename = "qualityMetrics")]
    pub quality: QualityMetrics,
    pub pagination: Pagination,
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Set only on the empty fallback response
    #[serde(default)]
    pub error: Option<String>,
}

impl AggregateResponse {
    /// Well-formed empty response carrying an explanatory marker
    pub fn empty(request_id: impl Into<String>, page_size: usize, reason: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            results: Vec::new(),
            regions_queried: Vec::new(),
            performance: RegionPerformance::default(),
            merging_info: MergingInfo::default(),
            quality: QualityMetrics::default(),
            pagination: Pagination::new(1, page_size, 0),
            generated_at: chrono::Utc::now(),
            error: Some(reason.into()),
        }
    }
}

/// Merge and dedup statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergingInfo {
    pub strategy: String,
    #[serde(rename = "totalResultsBeforeMerging")]
    pub total_results_before_merging: usize,
    #[serde(rename = "totalResultsAfterMerging")]
    pub total_results_after_merging: usize,
    #[serde(rename = "duplicatesRemoved")]
    pub duplicates_removed: usize,
    #[serde(rename = "deduplicationStrategy")]
    pub dedup_strategy: Option<String>,
    #[serde(rename = "mergingConfidence")]
    pub merging_confidence: f64,
}

/// Letter grade summarizing overall quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualityGrade {
    A,
    B,
    C,
    D,
    #[default]
    F,
}

impl QualityGrade {
    /// Grade bands are inclusive on their lower bound
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            QualityGrade::A
        } else if score >= 0.80 {
            QualityGrade::B
        } else if score >= 0.70 {
            QualityGrade::C
        } else if score >= 0.60 {
            QualityGrade::D
        } else {
            QualityGrade::F
        }
    }
}

/// Composite quality of the merged result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    #[serde(rename = "relevanceScore")]
    pub relevance_score: f64,
    #[serde(rename = "diversityScore")]
    pub diversity_score: f64,
    #[serde(rename = "freshnessScore")]
    pub freshness_score: f64,
    #[serde(rename = "coverageScore")]
    pub coverage_score: f64,
    #[serde(rename = "overallQuality")]
    pub overall_quality: f64,
    #[serde(rename = "qualityGrade")]
    pub quality_grade: QualityGrade,
}

/// Aggregate health across dispatched regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    #[default]
    Unhealthy,
}

/// Per-region line in the performance breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionMetrics {
    #[serde(rename = "regionId")]
    pub region_id: String,
    #[serde(rename = "regionName")]
    pub region_name: String,
    pub status: OutcomeStatus,
    #[serde(rename = "responseTimeMs")]
    pub response_time_ms: u64,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    #[serde(rename = "cacheHit")]
    pub cache_hit: bool,
    pub error: Option<String>,
}

/// Performance breakdown across all dispatched regions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionPerformance {
    pub regions: Vec<RegionMetrics>,
    #[serde(rename = "fastestRegionMs")]
    pub fastest_region_ms: Option<u64>,
    #[serde(rename = "slowestRegionMs")]
    pub slowest_region_ms: Option<u64>,
    #[serde(rename = "averageResponseTimeMs")]
    pub average_response_time_ms: f64,
    #[serde(rename = "successfulRegions")]
    pub successful_regions: usize,
    #[serde(rename = "failedRegions")]
    pub failed_regions: usize,
    #[serde(rename = "timedOutRegions")]
    pub timed_out_regions: usize,
    #[serde(rename = "cacheHits")]
    pub cache_hits: usize,
    #[serde(rename = "overallHealthStatus")]
    pub overall_health: HealthStatus,
}

/// Pagination window over the merged results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: usize,
    #[serde(rename = "totalResults")]
    pub total_results: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

impl Pagination {
    pub fn new(page: u32, page_size: usize, total_results: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_results.div_ceil(page_size);
        Self {
            page,
            page_size,
            total_results,
            total_pages,
            has_next: (page as usize) < total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(QualityGrade::from_score(0.90), QualityGrade::A);
        assert_eq!(QualityGrade::from_score(0.8999), QualityGrade::B);
        assert_eq!(QualityGrade::from_score(0.80), QualityGrade::B);
        assert_eq!(QualityGrade::from_score(0.70), QualityGrade::C);
        assert_eq!(QualityGrade::from_score(0.60), QualityGrade::D);
        assert_eq!(QualityGrade::from_score(0.59), QualityGrade::F);
        assert_eq!(QualityGrade::from_score(0.0), QualityGrade::F);
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 20, 45);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);

        let last = Pagination::new(3, 20, 45);
        assert!(!last.has_next);

        let empty = Pagination::new(1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_health_status_serializes_uppercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"DEGRADED\"");
    }

    #[test]
    fn test_empty_response_has_marker() {
        let response = AggregateResponse::empty("req-1", 20, "merge failed");
        assert!(response.results.is_empty());
        assert_eq!(response.error.as_deref(), Some("merge failed"));
        assert_eq!(response.quality.quality_grade, QualityGrade::F);
    }
}
