//! Combining per-region result lists into one ordered sequence.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::distance::haversine_distance;
use crate::models::{RegionOutcome, ResultItem};

/// Errors raised while merging
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Non-finite score for item {item_id} from region {region_id}")]
    NonFiniteScore { item_id: String, region_id: String },
}

/// Policy for combining and ordering items from multiple regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Concatenate in dispatch order
    Union,
    /// Relevance scaled by the source region's weight
    #[default]
    Weighted,
    /// One item from each region in turn
    RoundRobin,
    /// Relevance only
    RelevanceBased,
    /// Nearest to the reference point first
    DistanceBased,
}

impl MergeStrategy {
    /// Resolve a strategy name; unknown or missing names use the default
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("union") => MergeStrategy::Union,
            Some("weighted") => MergeStrategy::Weighted,
            Some("round_robin") => MergeStrategy::RoundRobin,
            Some("relevance_based") => MergeStrategy::RelevanceBased,
            Some("distance_based") => MergeStrategy::DistanceBased,
            None => MergeStrategy::default(),
            Some(other) => {
                tracing::debug!("Unknown merge strategy '{}', using default", other);
                MergeStrategy::default()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MergeStrategy::Union => "union",
            MergeStrategy::Weighted => "weighted",
            MergeStrategy::RoundRobin => "round_robin",
            MergeStrategy::RelevanceBased => "relevance_based",
            MergeStrategy::DistanceBased => "distance_based",
        }
    }
}

/// Output of the merge stage
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub items: Vec<ResultItem>,
    pub total_before_merging: usize,
}

/// An item tagged with the dispatch position of its region
struct Ranked<'a> {
    region_index: usize,
    region_id: &'a str,
    item: &'a ResultItem,
}

/// Merge region outcomes in dispatch order using `strategy`
///
/// Sorting strategies break ties by dispatch order, then by item id, so
/// identical inputs always produce identical output.
pub fn merge(
    outcomes: &[RegionOutcome],
    strategy: MergeStrategy,
    weights: &BTreeMap<String, f64>,
    reference: Option<(f64, f64)>,
) -> Result<MergeOutput, MergeError> {
    let total_before_merging = outcomes.iter().map(|o| o.items.len()).sum();

    let items = match strategy {
        MergeStrategy::Union => flatten(outcomes).map(|r| r.item.clone()).collect(),
        MergeStrategy::RoundRobin => round_robin(outcomes),
        MergeStrategy::Weighted => sort_by_score(outcomes, |r| {
            r.item.relevance_score * weights.get(r.region_id).copied().unwrap_or(1.0)
        })?,
        MergeStrategy::RelevanceBased => sort_by_score(outcomes, |r| r.item.relevance_score)?,
        MergeStrategy::DistanceBased => match reference {
            Some(point) => sort_by_distance(outcomes, point),
            None => {
                tracing::debug!("No reference point for distance merge, keeping dispatch order");
                flatten(outcomes).map(|r| r.item.clone()).collect()
            }
        },
    };

    Ok(MergeOutput {
        items,
        total_before_merging,
    })
}

fn flatten(outcomes: &[RegionOutcome]) -> impl Iterator<Item = Ranked<'_>> {
    outcomes.iter().enumerate().flat_map(|(region_index, outcome)| {
        outcome.items.iter().map(move |item| Ranked {
            region_index,
            region_id: outcome.region_id.as_str(),
            item,
        })
    })
}

fn tie_break(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    a.region_index
        .cmp(&b.region_index)
        .then_with(|| a.item.id.cmp(&b.item.id))
}

fn sort_by_score<F>(outcomes: &[RegionOutcome], score: F) -> Result<Vec<ResultItem>, MergeError>
where
    F: Fn(&Ranked<'_>) -> f64,
{
    let mut scored = Vec::new();
    for ranked in flatten(outcomes) {
        let value = score(&ranked);
        if !value.is_finite() {
            return Err(MergeError::NonFiniteScore {
                item_id: ranked.item.id.clone(),
                region_id: ranked.region_id.to_string(),
            });
        }
        scored.push((value, ranked));
    }

    scored.sort_by(|(a_score, a), (b_score, b)| {
        b_score
            .partial_cmp(a_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| tie_break(a, b))
    });

    Ok(scored.into_iter().map(|(_, r)| r.item.clone()).collect())
}

fn sort_by_distance(outcomes: &[RegionOutcome], reference: (f64, f64)) -> Vec<ResultItem> {
    let mut ranked: Vec<(Option<f64>, Ranked<'_>)> = flatten(outcomes)
        .map(|r| {
            let distance = r.item.coordinates().map(|point| haversine_distance(reference, point));
            (distance, r)
        })
        .collect();

    // Items without coordinates sort last
    ranked.sort_by(|(a_dist, a), (b_dist, b)| {
        let primary = match (a_dist, b_dist) {
            (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        primary.then_with(|| tie_break(a, b))
    });

    ranked.into_iter().map(|(_, r)| r.item.clone()).collect()
}

fn round_robin(outcomes: &[RegionOutcome]) -> Vec<ResultItem> {
    let total = outcomes.iter().map(|o| o.items.len()).sum();
    let mut merged = Vec::with_capacity(total);
    let mut cursors: Vec<_> = outcomes.iter().map(|o| o.items.iter()).collect();

    while merged.len() < total {
        for cursor in cursors.iter_mut() {
            if let Some(item) = cursor.next() {
                merged.push(item.clone());
            }
        }
    }

    merged
}
