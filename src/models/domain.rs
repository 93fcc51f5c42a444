use serde::{Deserialize, Serialize};

/// A searchable entity returned by a regional backend (e.g. a property)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(rename = "id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "relevanceScore", default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Region that produced this item, stamped by the dispatcher
    #[serde(rename = "sourceRegion", default)]
    pub source_region: Option<String>,
}

impl ResultItem {
    /// Coordinates as a (lat, lon) pair when both are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Region as reported by the region-health collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    #[serde(rename = "regionId")]
    pub id: String,
    pub name: String,
    pub healthy: bool,
    /// Higher priority regions are queried first when the candidate set is truncated
    #[serde(default)]
    pub priority: f64,
}

/// Terminal state of one region's search attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Timeout,
}

impl OutcomeStatus {
    /// Failed or timed out
    pub fn is_degraded(&self) -> bool {
        !matches!(self, OutcomeStatus::Success)
    }
}

/// Recorded result of one region's search within one aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionOutcome {
    #[serde(rename = "regionId")]
    pub region_id: String,
    #[serde(rename = "regionName")]
    pub region_name: String,
    pub status: OutcomeStatus,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub items: Vec<ResultItem>,
    #[serde(rename = "itemCount")]
    pub item_count: usize,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "cacheHit", default)]
    pub cache_hit: bool,
}

impl RegionOutcome {
    pub fn success(region: &RegionDescriptor, items: Vec<ResultItem>, elapsed_ms: u64) -> Self {
        Self {
            region_id: region.id.clone(),
            region_name: region.name.clone(),
            status: OutcomeStatus::Success,
            elapsed_ms,
            item_count: items.len(),
            items,
            error: None,
            cache_hit: false,
        }
    }

    pub fn failure(region: &RegionDescriptor, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            region_id: region.id.clone(),
            region_name: region.name.clone(),
            status: OutcomeStatus::Failure,
            elapsed_ms,
            items: Vec::new(),
            item_count: 0,
            error: Some(error.into()),
            cache_hit: false,
        }
    }

    pub fn timeout(region: &RegionDescriptor, budget_ms: u64) -> Self {
        Self {
            region_id: region.id.clone(),
            region_name: region.name.clone(),
            status: OutcomeStatus::Timeout,
            elapsed_ms: budget_ms,
            items: Vec::new(),
            item_count: 0,
            error: Some(format!("Region did not respond within {}ms", budget_ms)),
            cache_hit: false,
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "minLat", alias = "min_lat")]
    pub min_lat: f64,
    #[serde(rename = "maxLat", alias = "max_lat")]
    pub max_lat: f64,
    #[serde(rename = "minLon", alias = "min_lon")]
    pub min_lon: f64,
    #[serde(rename = "maxLon", alias = "max_lon")]
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Region-scoped search call sent to one regional backend
#[derive(Debug, Clone, Serialize)]
pub struct RegionQuery {
    pub region_id: String,
    pub query: Option<String>,
    pub destination: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    pub country: Option<String>,
    pub device: Option<String>,
}
