use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

use crate::models::domain::{BoundingBox, RegionQuery};

/// Hard cap on the number of regions a single request may ask for
pub const MAX_REGIONS_HARD_CAP: u8 = 10;

/// Upper bound for a per-region merge weight
pub const MAX_REGION_WEIGHT: f64 = 1000.0;

/// Cap on page size to prevent oversized responses
pub const MAX_PAGE_SIZE: u16 = 100;

/// Multi-region search request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_search_request"))]
pub struct SearchRequest {
    #[serde(rename = "requestId", default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub geo: GeoConstraints,
    #[serde(rename = "regionalPreferences", default)]
    pub regional_preferences: RegionalPreferences,
    #[serde(rename = "crossRegion", default)]
    pub cross_region: CrossRegionSettings,
    #[serde(rename = "callerContext", default)]
    pub caller: CallerContext,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(rename = "pageSize", default = "default_page_size")]
    pub page_size: u16,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            request_id: None,
            query: None,
            destination: None,
            geo: GeoConstraints::default(),
            regional_preferences: RegionalPreferences::default(),
            cross_region: CrossRegionSettings::default(),
            caller: CallerContext::default(),
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u16 {
    20
}

/// Geographic constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoConstraints {
    #[serde(rename = "boundingBox", default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Regional preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionalPreferences {
    #[serde(rename = "preferredRegions", default)]
    pub preferred_regions: Vec<String>,
    #[serde(rename = "excludedRegions", default)]
    pub excluded_regions: Vec<String>,
    #[serde(rename = "maxRegionsToQuery", default)]
    pub max_regions_to_query: Option<u8>,
}

/// Cross-region merge and dedup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossRegionSettings {
    #[serde(rename = "mergeStrategy", default)]
    pub merge_strategy: Option<String>,
    #[serde(rename = "deduplicationEnabled", default = "default_true")]
    pub dedup_enabled: bool,
    #[serde(rename = "deduplicationStrategy", default)]
    pub dedup_strategy: Option<String>,
    #[serde(rename = "regionWeights", default)]
    pub region_weights: BTreeMap<String, f64>,
    #[serde(rename = "responseTimeBudgetMs", default)]
    pub response_time_budget_ms: Option<u64>,
}

impl Default for CrossRegionSettings {
    fn default() -> Self {
        Self {
            merge_strategy: None,
            dedup_enabled: true,
            dedup_strategy: None,
            region_weights: BTreeMap::new(),
            response_time_budget_ms: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Caller context derived from locale/IP
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerContext {
    #[serde(rename = "detectedCountry", default)]
    pub detected_country: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl SearchRequest {
    /// Destination hint, if non-blank
    pub fn destination_hint(&self) -> Option<&str> {
        non_blank(&self.destination)
    }

    /// Reference point for distance ordering: explicit point, caller location, then bbox centre
    pub fn reference_point(&self) -> Option<(f64, f64)> {
        if let (Some(lat), Some(lon)) = (self.geo.latitude, self.geo.longitude) {
            return Some((lat, lon));
        }
        if let (Some(lat), Some(lon)) = (self.caller.latitude, self.caller.longitude) {
            return Some((lat, lon));
        }
        self.geo.bounding_box.map(|bbox| bbox.center())
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE) as usize
    }

    /// Translate into the region-scoped call sent to one backend
    pub fn scoped_to(&self, region_id: &str) -> RegionQuery {
        RegionQuery {
            region_id: region_id.to_string(),
            query: non_blank(&self.query).map(str::to_string),
            destination: self.destination_hint().map(str::to_string),
            bounding_box: self.geo.bounding_box,
            country: self.caller.detected_country.clone(),
            device: self.caller.device.clone(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn validate_search_request(req: &SearchRequest) -> Result<(), ValidationError> {
    if non_blank(&req.query).is_none() && req.destination_hint().is_none() {
        let mut err = ValidationError::new("missing_search_terms");
        err.message = Some("Either query or destination is required".into());
        return Err(err);
    }

    if let Some(max) = req.regional_preferences.max_regions_to_query {
        if max > MAX_REGIONS_HARD_CAP {
            let mut err = ValidationError::new("too_many_regions");
            err.message = Some(
                format!("maxRegionsToQuery must not exceed {}", MAX_REGIONS_HARD_CAP).into(),
            );
            return Err(err);
        }
    }

    if let Some((region, weight)) = req
        .cross_region
        .region_weights
        .iter()
        .find(|(_, w)| !w.is_finite() || **w < 0.0 || **w > MAX_REGION_WEIGHT)
    {
        let mut err = ValidationError::new("invalid_region_weight");
        err.message = Some(
            format!(
                "regionWeights[{}] = {} must be between 0 and {}",
                region, weight, MAX_REGION_WEIGHT
            )
            .into(),
        );
        return Err(err);
    }

    if req.cross_region.response_time_budget_ms == Some(0) {
        let mut err = ValidationError::new("invalid_budget");
        err.message = Some("responseTimeBudgetMs must be positive".into());
        return Err(err);
    }

    if req.page == 0 {
        let mut err = ValidationError::new("invalid_page");
        err.message = Some("page numbers start at 1".into());
        return Err(err);
    }

    Ok(())
}
