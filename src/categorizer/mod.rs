//! Semantic categorization of phrase occurrences
//!
//! Assigns each phrase occurrence to a category by combining three
//! signals: seed-word overlap, learned phrase/category affinity, and
//! seed words of other categories appearing in the local context window.
//! Every assignment also runs a learning step that strengthens the
//! winning category's affinity for the phrase.

pub mod taxonomy;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

pub use taxonomy::{Category, CategorySeed, CorrectionRecord, Taxonomy};

/// Bonus per distinct category whose seed words appear in the context
/// window
const CONTEXT_CATEGORY_BONUS: f64 = 0.2;

/// Learn events between renormalizations of raw co-occurrence counters
const RENORM_INTERVAL: u64 = 1000;

/// Assigns categories to phrase occurrences and learns from them
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticCategorizer;

impl SemanticCategorizer {
    pub fn new() -> Self {
        Self
    }

    /// Pick the best category for a phrase occurrence
    ///
    /// `context` is the text surrounding the occurrence (the occurrence
    /// itself excluded). Returns `None` when no category scores above
    /// zero — the occurrence stays uncategorized and is excluded
    /// downstream. Missing or empty taxonomy data degrades to `None`,
    /// never an error.
    pub fn categorize(&self, phrase: &str, context: &str, taxonomy: &Taxonomy) -> Option<String> {
        if taxonomy.is_empty() {
            return None;
        }

        let phrase = phrase.to_lowercase();
        let phrase_words: FxHashSet<&str> = phrase.split_whitespace().collect();
        let context_words = word_set(context);

        // BTreeMap order makes score iteration (and tie-breaking on
        // smallest id) deterministic
        let mut scores: Vec<(&str, f64)> = Vec::with_capacity(taxonomy.len());
        for (id, category) in &taxonomy.categories {
            let seed_overlap = phrase_words
                .iter()
                .filter(|word| category.seed_words.contains(**word))
                .count() as f64;

            let context_bonus = if category
                .seed_words
                .iter()
                .any(|seed| context_words.contains(seed.as_str()))
            {
                CONTEXT_CATEGORY_BONUS
            } else {
                0.0
            };

            scores.push((id.as_str(), seed_overlap + category.affinity(&phrase) + context_bonus));
        }

        let best = scores
            .iter()
            .map(|(_, score)| *score)
            .fold(f64::NEG_INFINITY, f64::max);
        if best <= 0.0 {
            return None;
        }

        let tied: Vec<&str> = scores
            .iter()
            .filter(|(_, score)| *score == best)
            .map(|(id, _)| *id)
            .collect();

        if tied.len() == 1 {
            return Some(tied[0].to_string());
        }

        // Ties go to the most recently corrected category for this exact
        // phrase, falling back to the smallest id (first in tied order)
        let corrected = tied
            .iter()
            .filter_map(|id| {
                taxonomy
                    .get(id)
                    .and_then(|c| c.latest_correction_for(&phrase))
                    .map(|record| (record.recorded_at, *id))
            })
            .max_by_key(|(at, _)| *at)
            .map(|(_, id)| id);

        Some(corrected.unwrap_or(tied[0]).to_string())
    }

    /// Strengthen the winning category's affinity for a phrase
    ///
    /// Raw counters grow without bound; the scoring weight is a logistic
    /// squash of the counter into [0, 1], and counters are periodically
    /// halved so high-frequency phrases cannot dominate indefinitely.
    pub fn learn(&self, taxonomy: &mut Taxonomy, category_id: &str, phrase: &str) {
        let phrase = phrase.to_lowercase();
        let pin = latest_correction_target(taxonomy, &phrase);

        let category = taxonomy.get_or_create(category_id);
        let count = category
            .cooccurrence_counts
            .entry(phrase.clone())
            .or_insert(0.0);
        *count += 1.0;
        let weight = if pin.as_deref() == Some(category_id) {
            1.0
        } else {
            squash(*count)
        };
        category.learned_cooccurrence.insert(phrase, weight);

        taxonomy.learn_events += 1;
        if taxonomy.learn_events % RENORM_INTERVAL == 0 {
            self.renormalize(taxonomy);
        }
    }

    /// Record an explicit user correction
    ///
    /// The phrase's affinity for the target category is pinned at 1.0 and
    /// the full correction history is retained; the latest correction is
    /// the tie-break winner. Unknown category ids are created lazily.
    pub fn apply_correction(
        &self,
        taxonomy: &mut Taxonomy,
        phrase: &str,
        from_category: &str,
        to_category: &str,
        now: DateTime<Utc>,
    ) {
        let phrase = phrase.to_lowercase();
        info!(
            "Correction: '{}' {} -> {}",
            phrase, from_category, to_category
        );

        taxonomy.get_or_create(from_category);
        let target = taxonomy.get_or_create(to_category);
        target.user_corrections.push(CorrectionRecord {
            phrase: phrase.clone(),
            from_category: from_category.to_string(),
            to_category: to_category.to_string(),
            recorded_at: now,
        });
        target.learned_cooccurrence.insert(phrase, 1.0);
    }

    /// Halve raw counters and recompute squashed weights
    fn renormalize(&self, taxonomy: &mut Taxonomy) {
        debug!(
            "Renormalizing co-occurrence counters after {} learn events",
            taxonomy.learn_events
        );

        // Pins survive renormalization: the latest correction per phrase
        // keeps its target at 1.0
        let pins: Vec<(String, Option<String>)> = taxonomy
            .categories
            .values()
            .flat_map(|c| c.cooccurrence_counts.keys().cloned())
            .collect::<FxHashSet<_>>()
            .into_iter()
            .map(|phrase| {
                let pin = latest_correction_target(taxonomy, &phrase);
                (phrase, pin)
            })
            .collect();

        for category in taxonomy.categories.values_mut() {
            for (phrase, count) in category.cooccurrence_counts.iter_mut() {
                *count /= 2.0;
                let pinned = pins
                    .iter()
                    .any(|(p, pin)| p == phrase && pin.as_deref() == Some(category.id.as_str()));
                let weight = if pinned { 1.0 } else { squash(*count) };
                category.learned_cooccurrence.insert(phrase.clone(), weight);
            }
        }
    }
}

/// Logistic squash of a raw counter into [0, 1]
fn squash(count: f64) -> f64 {
    1.0 / (1.0 + (-(count - 10.0) / 5.0).exp())
}

/// Where the latest correction (across all categories) sends a phrase
fn latest_correction_target(taxonomy: &Taxonomy, phrase: &str) -> Option<String> {
    taxonomy
        .categories
        .values()
        .filter_map(|c| c.latest_correction_for(phrase))
        .max_by_key(|record| record.recorded_at)
        .map(|record| record.to_category.clone())
}

fn word_set(text: &str) -> FxHashSet<String> {
    let mut words = FxHashSet::default();
    let mut word = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word.extend(ch.to_lowercase());
        } else if !word.is_empty() {
            words.insert(std::mem::take(&mut word));
        }
    }
    if !word.is_empty() {
        words.insert(word);
    }
    words
}
