// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{BoundingBox, OutcomeStatus, RegionDescriptor, RegionOutcome, RegionQuery, ResultItem};
pub use requests::{CallerContext, CrossRegionSettings, GeoConstraints, RegionalPreferences, SearchRequest, MAX_REGIONS_HARD_CAP};
pub use responses::{AggregateResponse, HealthStatus, MergingInfo, Pagination, QualityGrade, QualityMetrics, RegionMetrics, RegionPerformance};
