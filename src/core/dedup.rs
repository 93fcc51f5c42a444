//! Cross-region duplicate removal.
//!
//! Items are keyed by the selected identity strategy; the first occurrence
//! of each key wins and the survivors keep their merged order.

use std::collections::HashSet;

use crate::models::{RegionOutcome, ResultItem};

/// How the identity of a result item is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    /// Item id verbatim
    #[default]
    PropertyId,
    /// `"latitude,longitude"`
    Coordinates,
    /// Lower-cased, trimmed name (exact match only)
    NameSimilarity,
}

impl DedupStrategy {
    /// Resolve a strategy name; unknown or missing names use the default
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(|n| n.trim().to_ascii_lowercase()).as_deref() {
            Some("property_id") => DedupStrategy::PropertyId,
            Some("coordinates") => DedupStrategy::Coordinates,
            Some("name_similarity") => DedupStrategy::NameSimilarity,
            None => DedupStrategy::default(),
            Some(other) => {
                tracing::debug!("Unknown dedup strategy '{}', using default", other);
                DedupStrategy::default()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DedupStrategy::PropertyId => "property_id",
            DedupStrategy::Coordinates => "coordinates",
            DedupStrategy::NameSimilarity => "name_similarity",
        }
    }

    /// Identity key of an item under this strategy
    ///
    /// Items lacking the keyed attribute fall back to their id so they are
    /// never collapsed with unrelated items.
    pub fn identity_key(&self, item: &ResultItem) -> String {
        match self {
            DedupStrategy::PropertyId => format!("id:{}", item.id),
            DedupStrategy::Coordinates => match item.coordinates() {
                Some((lat, lon)) => format!("{},{}", lat, lon),
                None => format!("id:{}", item.id),
            },
            DedupStrategy::NameSimilarity => {
                let name = item.name.trim().to_lowercase();
                if name.is_empty() {
                    format!("id:{}", item.id)
                } else {
                    format!("name:{}", name)
                }
            }
        }
    }
}

/// Remove duplicates, keeping the first occurrence of each identity key
///
/// Returns the surviving items and the number removed.
pub fn deduplicate(items: Vec<ResultItem>, strategy: DedupStrategy) -> (Vec<ResultItem>, usize) {
    let before = items.len();
    let mut seen = HashSet::with_capacity(before);

    let unique: Vec<ResultItem> = items
        .into_iter()
        .filter(|item| seen.insert(strategy.identity_key(item)))
        .collect();

    let removed = before - unique.len();
    if removed > 0 {
        tracing::debug!("Removed {} duplicates using {}", removed, strategy.name());
    }

    (unique, removed)
}

/// Remove duplicates across region outcomes in dispatch order
///
/// The copy from the earliest dispatched region survives regardless of how
/// the survivors are ordered later. Each outcome's `item_count` keeps the
/// number of items the region originally returned.
pub fn deduplicate_outcomes(outcomes: &mut [RegionOutcome], strategy: DedupStrategy) -> usize {
    let mut seen = HashSet::new();
    let mut removed = 0;

    for outcome in outcomes.iter_mut() {
        let before = outcome.items.len();
        outcome.items.retain(|item| seen.insert(strategy.identity_key(item)));
        removed += before - outcome.items.len();
    }

    if removed > 0 {
        tracing::debug!("Removed {} cross-region duplicates using {}", removed, strategy.name());
    }

    removed
}
