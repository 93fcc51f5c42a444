use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

use crate::core::distance::{bounding_boxes_intersect, calculate_bounding_box};
use crate::models::{BoundingBox, RegionDescriptor};
use crate::services::RegionDirectory;

/// Errors that can occur when looking up region health
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Region registry unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),
}

/// Static definition of a region
#[derive(Debug, Clone, Deserialize)]
pub struct RegionDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default)]
    pub bounds: Option<BoundingBox>,
    /// Alternative to `bounds`: centre point plus radius
    #[serde(default)]
    pub center: Option<(f64, f64)>,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub priority: f64,
    #[serde(default = "default_healthy")]
    pub healthy: bool,
}

fn default_healthy() -> bool { true }

impl RegionDefinition {
    /// Coverage area, derived from the centre/radius pair when no explicit bounds are set
    pub fn coverage(&self) -> Option<BoundingBox> {
        self.bounds.or_else(|| match (self.center, self.radius_km) {
            (Some((lat, lon)), Some(radius)) => Some(calculate_bounding_box(lat, lon, radius)),
            _ => None,
        })
    }

    fn serves_country(&self, country: &str) -> bool {
        self.countries.iter().any(|c| c.eq_ignore_ascii_case(country))
    }

    fn serves_destination(&self, destination: &str) -> bool {
        let destination = destination.trim();
        self.destinations.iter().any(|d| d.eq_ignore_ascii_case(destination))
    }
}

/// In-process region directory built from configured region definitions
///
/// Health flags start from configuration and can be flipped at runtime,
/// e.g. by an external health checker.
pub struct StaticRegionRegistry {
    definitions: Vec<RegionDefinition>,
    health: RwLock<HashMap<String, bool>>,
}

impl StaticRegionRegistry {
    pub fn new(definitions: Vec<RegionDefinition>) -> Self {
        let health = definitions
            .iter()
            .map(|d| (d.id.clone(), d.healthy))
            .collect();

        Self {
            definitions,
            health: RwLock::new(health),
        }
    }

    /// Update a region's health flag
    pub fn set_health(&self, region_id: &str, healthy: bool) -> Result<(), RegistryError> {
        let mut health = self
            .health
            .write()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        match health.get_mut(region_id) {
            Some(flag) => {
                *flag = healthy;
                tracing::info!("Region {} marked {}", region_id, if healthy { "healthy" } else { "unhealthy" });
                Ok(())
            }
            None => Err(RegistryError::UnknownRegion(region_id.to_string())),
        }
    }

    fn describe(&self, definition: &RegionDefinition, health: &HashMap<String, bool>) -> RegionDescriptor {
        RegionDescriptor {
            id: definition.id.clone(),
            name: definition.name.clone(),
            healthy: health.get(&definition.id).copied().unwrap_or(false),
            priority: definition.priority,
        }
    }

    fn select<F>(&self, predicate: F) -> Result<Vec<RegionDescriptor>, RegistryError>
    where
        F: Fn(&RegionDefinition) -> bool,
    {
        let health = self
            .health
            .read()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        Ok(self
            .definitions
            .iter()
            .filter(|d| predicate(d))
            .map(|d| self.describe(d, &health))
            .collect())
    }
}

impl RegionDirectory for StaticRegionRegistry {
    fn regions(&self) -> Result<Vec<RegionDescriptor>, RegistryError> {
        self.select(|_| true)
    }

    fn healthy_regions(
        &self,
        country: Option<&str>,
        bbox: Option<&BoundingBox>,
    ) -> Result<Vec<RegionDescriptor>, RegistryError> {
        let regions = self.select(|d| {
            let country_ok = country.map_or(true, |c| d.serves_country(c));
            let bbox_ok = bbox.map_or(true, |b| {
                d.coverage().is_some_and(|coverage| bounding_boxes_intersect(&coverage, b))
            });
            country_ok && bbox_ok
        })?;

        Ok(regions.into_iter().filter(|r| r.healthy).collect())
    }

    fn regions_for_destination(&self, destination: &str) -> Result<Vec<RegionDescriptor>, RegistryError> {
        self.select(|d| d.serves_destination(destination))
    }

    fn is_healthy(&self, region_id: &str) -> Result<bool, RegistryError> {
        let health = self
            .health
            .read()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        Ok(health.get(region_id).copied().unwrap_or(false))
    }
}
