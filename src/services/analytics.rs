use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AggregateResponse, SearchRequest};
use crate::services::AnalyticsSink;

/// Errors that can occur when recording analytics
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Analytics sink unavailable: {0}")]
    Unavailable(String),
}

/// Analytics sink that emits one structured log event per aggregation
#[derive(Debug, Clone, Default)]
pub struct TracingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for TracingAnalyticsSink {
    async fn record(
        &self,
        request: &SearchRequest,
        response: &AggregateResponse,
        elapsed_ms: u64,
    ) -> Result<(), AnalyticsError> {
        tracing::info!(
            target: "region_search::analytics",
            request_id = %response.request_id,
            destination = request.destination.as_deref().unwrap_or(""),
            regions = response.regions_queried.len(),
            results = response.merging_info.total_results_after_merging,
            duplicates_removed = response.merging_info.duplicates_removed,
            health = ?response.performance.overall_health,
            grade = ?response.quality.quality_grade,
            elapsed_ms,
            "multi-region search completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_sink_accepts_empty_response() {
        let request = SearchRequest {
            destination: Some("Hanoi".to_string()),
            ..Default::default()
        };
        let response = AggregateResponse::empty("req-1", 20, "merge failed");

        let result = tokio_test::block_on(TracingAnalyticsSink.record(&request, &response, 12));
        assert!(result.is_ok());
    }
}
