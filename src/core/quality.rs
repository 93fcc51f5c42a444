use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::core::distance::is_within_bounding_box;
use crate::models::{BoundingBox, QualityGrade, QualityMetrics, ResultItem};

/// Freshness decays with this time constant (days)
const FRESHNESS_DECAY_DAYS: f64 = 30.0;

/// Freshness credited to items with no timestamp
const UNKNOWN_FRESHNESS: f64 = 0.5;

/// Weights of the quality sub-scores
#[derive(Debug, Clone, Copy)]
pub struct QualityWeights {
    pub relevance: f64,
    pub diversity: f64,
    pub freshness: f64,
    pub coverage: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            relevance: 0.40,
            diversity: 0.25,
            freshness: 0.20,
            coverage: 0.15,
        }
    }
}

/// Computes the composite quality of a merged result set
///
/// Scoring formula:
/// overall = (
///     relevance * 0.40 +   # mean relevance score
///     diversity * 0.25 +   # distinct source regions / dispatched regions
///     freshness * 0.20 +   # mean exp(-age_days / 30)
///     coverage  * 0.15     # items satisfying the geographic facet
/// )
#[derive(Debug, Clone, Default)]
pub struct QualityAssessor {
    weights: QualityWeights,
}

impl QualityAssessor {
    pub fn new(weights: QualityWeights) -> Self {
        Self { weights }
    }

    pub fn assess(&self, items: &[ResultItem], dispatched_regions: usize, bbox: Option<&BoundingBox>) -> QualityMetrics {
        self.assess_at(items, dispatched_regions, bbox, Utc::now())
    }

    /// Assess relative to a fixed clock
    pub fn assess_at(
        &self,
        items: &[ResultItem],
        dispatched_regions: usize,
        bbox: Option<&BoundingBox>,
        now: DateTime<Utc>,
    ) -> QualityMetrics {
        let relevance_score = relevance_score(items);
        let diversity_score = diversity_score(items, dispatched_regions);
        let freshness_score = freshness_score(items, now);
        let coverage_score = coverage_score(items, bbox);

        let overall_quality = (relevance_score * self.weights.relevance
            + diversity_score * self.weights.diversity
            + freshness_score * self.weights.freshness
            + coverage_score * self.weights.coverage)
            .clamp(0.0, 1.0);

        QualityMetrics {
            relevance_score,
            diversity_score,
            freshness_score,
            coverage_score,
            overall_quality,
            quality_grade: QualityGrade::from_score(overall_quality),
        }
    }
}

/// Mean relevance, 0 for an empty set
#[inline]
fn relevance_score(items: &[ResultItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let total: f64 = items.iter().map(|i| i.relevance_score).sum();
    (total / items.len() as f64).clamp(0.0, 1.0)
}

#[inline]
fn diversity_score(items: &[ResultItem], dispatched_regions: usize) -> f64 {
    if items.is_empty() || dispatched_regions == 0 {
        return 0.0;
    }
    let regions: HashSet<&str> = items
        .iter()
        .filter_map(|i| i.source_region.as_deref())
        .collect();
    (regions.len() as f64 / dispatched_regions as f64).min(1.0)
}

#[inline]
fn freshness_score(items: &[ResultItem], now: DateTime<Utc>) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let total: f64 = items
        .iter()
        .map(|i| match i.updated_at {
            Some(updated) => {
                let age_days = (now - updated).num_seconds().max(0) as f64 / 86_400.0;
                (-age_days / FRESHNESS_DECAY_DAYS).exp()
            }
            None => UNKNOWN_FRESHNESS,
        })
        .sum();
    (total / items.len() as f64).clamp(0.0, 1.0)
}

#[inline]
fn coverage_score(items: &[ResultItem], bbox: Option<&BoundingBox>) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let covered = items
        .iter()
        .filter(|i| match (i.coordinates(), bbox) {
            (Some((lat, lon)), Some(b)) => is_within_bounding_box(lat, lon, b),
            (Some(_), None) => true,
            (None, _) => false,
        })
        .count();
    covered as f64 / items.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(region: &str, relevance: f64, coords: Option<(f64, f64)>, updated_at: Option<DateTime<Utc>>) -> ResultItem {
        ResultItem {
            id: format!("{}-{}", region, relevance),
            name: "Hotel".to_string(),
            relevance_score: relevance,
            latitude: coords.map(|c| c.0),
            longitude: coords.map(|c| c.1),
            updated_at,
            source_region: Some(region.to_string()),
        }
    }

    #[test]
    fn test_empty_set_scores_zero() {
        let metrics = QualityAssessor::default().assess(&[], 3, None);
        assert_eq!(metrics.relevance_score, 0.0);
        assert_eq!(metrics.overall_quality, 0.0);
        assert_eq!(metrics.quality_grade, QualityGrade::F);
    }

    #[test]
    fn test_perfect_set_grades_a() {
        let now = Utc::now();
        let items = vec![
            item("a", 1.0, Some((21.0, 105.8)), Some(now)),
            item("b", 1.0, Some((21.1, 105.9)), Some(now)),
        ];
        let metrics = QualityAssessor::default().assess_at(&items, 2, None, now);

        assert!((metrics.overall_quality - 1.0).abs() < 1e-9);
        assert_eq!(metrics.quality_grade, QualityGrade::A);
    }

    #[test]
    fn test_weighted_formula() {
        let now = Utc::now();
        // relevance 0.5, diversity 0.5 (1 of 2 regions), freshness 0.5 (no timestamps), coverage 0
        let items = vec![item("a", 0.4, None, None), item("a", 0.6, None, None)];
        let metrics = QualityAssessor::default().assess_at(&items, 2, None, now);

        assert!((metrics.relevance_score - 0.5).abs() < 1e-9);
        assert!((metrics.diversity_score - 0.5).abs() < 1e-9);
        assert!((metrics.freshness_score - 0.5).abs() < 1e-9);
        assert_eq!(metrics.coverage_score, 0.0);
        let expected = 0.40 * 0.5 + 0.25 * 0.5 + 0.20 * 0.5;
        assert!((metrics.overall_quality - expected).abs() < 1e-9);
        assert_eq!(metrics.quality_grade, QualityGrade::F);
    }

    #[test]
    fn test_freshness_decays_with_age() {
        let now = Utc::now();
        let fresh = freshness_score(&[item("a", 1.0, None, Some(now))], now);
        let stale = freshness_score(&[item("a", 1.0, None, Some(now - Duration::days(90)))], now);
        assert!(fresh > 0.99);
        assert!(stale < 0.1);
    }

    #[test]
    fn test_coverage_respects_bbox() {
        let bbox = BoundingBox { min_lat: 20.0, max_lat: 22.0, min_lon: 105.0, max_lon: 106.0 };
        let items = vec![
            item("a", 1.0, Some((21.0, 105.5)), None),
            item("a", 1.0, Some((10.8, 106.6)), None),
        ];
        assert!((coverage_score(&items, Some(&bbox)) - 0.5).abs() < 1e-9);
        assert!((coverage_score(&items, None) - 1.0).abs() < 1e-9);
    }
}
