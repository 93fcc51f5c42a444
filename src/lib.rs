//! Region Search - Multi-region search aggregation engine
//!
//! This library fans a single search request out to several regional
//! backends concurrently, collects their outcomes under one response-time
//! budget, then merges, deduplicates and grades the combined results.

pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use crate::core::{AggregationError, AggregatorConfig, MergeStrategy, DedupStrategy, MultiRegionAggregator};
pub use crate::models::{AggregateResponse, HealthStatus, QualityGrade, RegionOutcome, ResultItem, SearchRequest};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(MergeStrategy::default().name(), "weighted");
        assert_eq!(DedupStrategy::default().name(), "property_id");
        assert_eq!(AggregatorConfig::default().default_region, "global");
    }
}
