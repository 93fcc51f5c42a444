use std::sync::Arc;

use crate::models::{RegionDescriptor, SearchRequest};
use crate::services::{RegionDirectory, RegistryError};

/// Resolves which regions a request is dispatched to
///
/// # Selection stages
/// 1. Union of explicitly preferred, bounding-box, caller-country and destination regions
/// 2. Remove explicitly excluded regions
/// 3. Keep regions the directory reports healthy
/// 4. Order preferred regions first, then by priority (descending)
/// 5. Truncate to the region limit
///
/// An empty selection, or an unavailable directory, degrades to the default region.
#[derive(Clone)]
pub struct RegionCatalog {
    directory: Arc<dyn RegionDirectory>,
    max_parallel_regions: usize,
    default_region: String,
}

impl RegionCatalog {
    pub fn new(directory: Arc<dyn RegionDirectory>, max_parallel_regions: usize, default_region: impl Into<String>) -> Self {
        Self {
            directory,
            max_parallel_regions,
            default_region: default_region.into(),
        }
    }

    /// Number of regions a request may be dispatched to
    pub fn region_limit(&self, request: &SearchRequest) -> usize {
        let requested = request
            .regional_preferences
            .max_regions_to_query
            .map(usize::from)
            .unwrap_or(self.max_parallel_regions);

        self.max_parallel_regions.min(requested).max(1)
    }

    /// Select regions for a request; never returns an empty list
    pub fn select_regions(&self, request: &SearchRequest) -> Vec<RegionDescriptor> {
        match self.try_select(request) {
            Ok(regions) if !regions.is_empty() => regions,
            Ok(_) => {
                tracing::info!("No healthy candidate regions, falling back to {}", self.default_region);
                vec![self.fallback_region()]
            }
            Err(e) => {
                tracing::warn!("Region directory unavailable, falling back to {}: {}", self.default_region, e);
                vec![self.fallback_region()]
            }
        }
    }

    fn try_select(&self, request: &SearchRequest) -> Result<Vec<RegionDescriptor>, RegistryError> {
        let prefs = &request.regional_preferences;
        let mut candidates: Vec<(RegionDescriptor, bool)> = Vec::new();

        let mut add = |region: RegionDescriptor, preferred: bool| {
            if let Some(existing) = candidates.iter_mut().find(|(r, _)| r.id == region.id) {
                existing.1 |= preferred;
            } else {
                candidates.push((region, preferred));
            }
        };

        // (a) explicit preferences
        if !prefs.preferred_regions.is_empty() {
            for region in self.directory.regions()? {
                if prefs.preferred_regions.contains(&region.id) {
                    add(region, true);
                }
            }
        }

        // (b) geographic constraint
        if let Some(bbox) = &request.geo.bounding_box {
            for region in self.directory.healthy_regions(None, Some(bbox))? {
                add(region, false);
            }
        }

        // (c) caller country
        if let Some(country) = request.caller.detected_country.as_deref() {
            for region in self.directory.healthy_regions(Some(country), None)? {
                add(region, false);
            }
        }

        // (d) destination hint
        if let Some(destination) = request.destination_hint() {
            for region in self.directory.regions_for_destination(destination)? {
                add(region, false);
            }
        }

        let mut selected = Vec::with_capacity(candidates.len());
        for (region, preferred) in candidates {
            if prefs.excluded_regions.contains(&region.id) {
                continue;
            }
            if !self.directory.is_healthy(&region.id)? {
                tracing::debug!("Skipping unhealthy region {}", region.id);
                continue;
            }
            selected.push((region, preferred));
        }

        // Stable sort keeps union order for equal keys
        selected.sort_by(|(a, a_pref), (b, b_pref)| {
            b_pref.cmp(a_pref).then_with(|| {
                b.priority
                    .partial_cmp(&a.priority)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        let limit = self.region_limit(request);
        Ok(selected
            .into_iter()
            .take(limit)
            .map(|(region, _)| region)
            .collect())
    }

    fn fallback_region(&self) -> RegionDescriptor {
        let known = self
            .directory
            .regions()
            .ok()
            .and_then(|regions| regions.into_iter().find(|r| r.id == self.default_region));

        known.unwrap_or_else(|| RegionDescriptor {
            id: self.default_region.clone(),
            name: self.default_region.clone(),
            healthy: true,
            priority: 0.0,
        })
    }
}
