// Core aggregation pipeline exports
pub mod aggregator;
pub mod assembler;
pub mod catalog;
pub mod collector;
pub mod dedup;
pub mod dispatcher;
pub mod distance;
pub mod merge;
pub mod quality;

pub use aggregator::{AggregationError, AggregatorConfig, MultiRegionAggregator};
pub use assembler::{classify_health, merging_confidence, region_performance, Assembly, ResponseAssembler};
pub use catalog::RegionCatalog;
pub use collector::ResultCollector;
pub use dedup::{deduplicate, deduplicate_outcomes, DedupStrategy};
pub use dispatcher::{PendingCall, RegionDispatcher};
pub use distance::{bounding_boxes_intersect, calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use merge::{merge, MergeError, MergeOutput, MergeStrategy};
pub use quality::{QualityAssessor, QualityWeights};
