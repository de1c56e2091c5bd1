//! Category taxonomy: seed configuration plus learned state
//!
//! Seed words arrive as configuration; everything else on a category is
//! learned at runtime. Categories are never deleted, and the correction
//! history is retained in full so tie-breaking can always consult the
//! most recent user decision for a phrase.

use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seed-word configuration for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySeed {
    pub id: String,
    pub label: String,
    pub seed_words: Vec<String>,
}

impl CategorySeed {
    pub fn new(id: impl Into<String>, label: impl Into<String>, seed_words: &[&str]) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            seed_words: seed_words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// A recorded user correction, most recent last
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub phrase: String,
    pub from_category: String,
    pub to_category: String,
    pub recorded_at: DateTime<Utc>,
}

/// One semantic category with its learned state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,

    /// Configured seed words, lowercase
    pub seed_words: FxHashSet<String>,

    /// Raw phrase co-occurrence counters (internal; squashed into
    /// `learned_cooccurrence` for scoring)
    pub cooccurrence_counts: FxHashMap<String, f64>,

    /// Learned phrase affinity in [0, 1]
    pub learned_cooccurrence: FxHashMap<String, f64>,

    /// Corrections that targeted this category
    pub user_corrections: Vec<CorrectionRecord>,
}

impl Category {
    pub fn from_seed(seed: &CategorySeed) -> Self {
        Self {
            id: seed.id.clone(),
            label: seed.label.clone(),
            seed_words: seed.seed_words.iter().map(|w| w.to_lowercase()).collect(),
            cooccurrence_counts: FxHashMap::default(),
            learned_cooccurrence: FxHashMap::default(),
            user_corrections: Vec::new(),
        }
    }

    /// Bare category created lazily by a correction against an unknown id
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            seed_words: FxHashSet::default(),
            cooccurrence_counts: FxHashMap::default(),
            learned_cooccurrence: FxHashMap::default(),
            user_corrections: Vec::new(),
        }
    }

    /// Learned affinity for a phrase (0 when unseen)
    pub fn affinity(&self, phrase: &str) -> f64 {
        self.learned_cooccurrence.get(phrase).copied().unwrap_or(0.0)
    }

    /// The most recent correction that moved `phrase` into this category
    pub fn latest_correction_for(&self, phrase: &str) -> Option<&CorrectionRecord> {
        self.user_corrections
            .iter()
            .rev()
            .find(|record| record.phrase == phrase)
    }
}

/// The full category set plus learning bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Categories by id; ordered map so iteration (and therefore
    /// tie-breaking) is deterministic
    pub categories: BTreeMap<String, Category>,

    /// Learning-step invocations since the last renormalization
    pub learn_events: u64,
}

impl Taxonomy {
    pub fn from_seeds(seeds: &[CategorySeed]) -> Self {
        let categories = seeds
            .iter()
            .map(|seed| (seed.id.clone(), Category::from_seed(seed)))
            .collect();
        Self {
            categories,
            learn_events: 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    /// Fetch a category, creating a bare one for unknown ids
    pub fn get_or_create(&mut self, id: &str) -> &mut Category {
        self.categories
            .entry(id.to_string())
            .or_insert_with(|| Category::bare(id))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Total learned phrase associations across categories
    pub fn learned_phrase_count(&self) -> usize {
        self.categories
            .values()
            .map(|c| c.learned_cooccurrence.len())
            .sum()
    }

    /// Total recorded corrections across categories
    pub fn correction_count(&self) -> usize {
        self.categories
            .values()
            .map(|c| c.user_corrections.len())
            .sum()
    }

    /// Overlay learned state from a persisted taxonomy onto this one
    ///
    /// Seed configuration always comes from the live seeds; persisted
    /// categories unknown to the seeds are kept as-is (categories are
    /// never deleted).
    pub fn merge_learned(&mut self, persisted: Taxonomy) {
        for (id, stored) in persisted.categories {
            match self.categories.get_mut(&id) {
                Some(live) => {
                    live.cooccurrence_counts = stored.cooccurrence_counts;
                    live.learned_cooccurrence = stored.learned_cooccurrence;
                    live.user_corrections = stored.user_corrections;
                }
                None => {
                    self.categories.insert(id, stored);
                }
            }
        }
        self.learn_events = persisted.learn_events;
    }
}
