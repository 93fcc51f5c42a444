//! Adapters for the collaborators the aggregation engine depends on.
//!
//! The engine only sees the traits below; the concrete types are the
//! production implementations wired up by the binary.

pub mod analytics;
pub mod backend;
pub mod cache;
pub mod registry;

pub use analytics::{AnalyticsError, TracingAnalyticsSink};
pub use backend::{BackendError, HttpRegionBackend};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use registry::{RegionDefinition, RegistryError, StaticRegionRegistry};

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{AggregateResponse, BoundingBox, RegionDescriptor, RegionOutcome, RegionQuery, ResultItem, SearchRequest};

/// Region health and configuration lookup
pub trait RegionDirectory: Send + Sync {
    /// Every known region, healthy or not
    fn regions(&self) -> Result<Vec<RegionDescriptor>, RegistryError>;

    /// Healthy regions, optionally narrowed to those serving a country and/or
    /// overlapping a bounding box
    fn healthy_regions(
        &self,
        country: Option<&str>,
        bbox: Option<&BoundingBox>,
    ) -> Result<Vec<RegionDescriptor>, RegistryError>;

    /// Regions associated with a destination name
    fn regions_for_destination(&self, destination: &str) -> Result<Vec<RegionDescriptor>, RegistryError>;

    fn is_healthy(&self, region_id: &str) -> Result<bool, RegistryError>;
}

/// A regional search backend
#[async_trait]
pub trait RegionBackend: Send + Sync {
    async fn search(&self, query: &RegionQuery) -> Result<Vec<ResultItem>, BackendError>;
}

/// Cache of per-region outcomes keyed by request fingerprint + region id
#[async_trait]
pub trait OutcomeCache: Send + Sync {
    /// Returns `None` on miss; lookup errors are treated as misses
    async fn get(&self, key: &str) -> Option<RegionOutcome>;

    async fn put(&self, key: &str, outcome: &RegionOutcome, ttl: Duration);
}

/// Fire-and-forget analytics recording
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(
        &self,
        request: &SearchRequest,
        response: &AggregateResponse,
        elapsed_ms: u64,
    ) -> Result<(), AnalyticsError>;
}
