//! Annotation engine orchestrating the full pipeline
//!
//! One `process()` call runs the whole sequence: fuzzy correction,
//! candidate extraction (which folds the document into the corpus
//! statistics), occurrence location, categorization with its learning
//! step, confidence adjustment through the behavior learner, overlap
//! resolution, and the shown-event write-back for every highlight that
//! survives.
//!
//! All learned state lives in explicit buckets behind their own locks
//! (corpus statistics, taxonomy, interaction records), so concurrent
//! calls against a shared engine never corrupt counters and tests can
//! inject fresh state freely. Feedback entry points (`record_clicked`,
//! `record_ignored`, `apply_correction`) mutate their buckets
//! independently of `process()`.

use crate::categorizer::{CategorySeed, SemanticCategorizer, Taxonomy};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigOutcome, ConfigPatch, EngineConfig};
use crate::error::Result;
use crate::extractor::{segment, CorpusStats, PhraseExtractor, StopwordFilter};
use crate::fuzzy::FuzzyMatcher;
use crate::learner::{
    default_source, BehaviorLearningEngine, LearnerSnapshot, LearnerStats, RandomSource,
};
use crate::storage::{self, KeyValueStore, MemoryStore};
use crate::types::Highlight;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Storage keys for persisted state buckets
pub const KEY_CORPUS: &str = "theia/corpus";
pub const KEY_TAXONOMY: &str = "theia/taxonomy";
pub const KEY_INTERACTIONS: &str = "theia/interactions";

/// Read-only diagnostics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatistics {
    pub extractor: ExtractorStatistics,
    pub categorizer: CategorizerStatistics,
    pub learner: LearnerStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorStatistics {
    pub total_documents: u64,
    pub vocabulary_size: usize,
    pub token_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizerStatistics {
    pub category_count: usize,
    pub learned_phrase_count: usize,
    pub correction_count: usize,
}

/// A located candidate occurrence moving through the pipeline
#[derive(Debug, Clone)]
struct PendingHighlight {
    start: usize,
    end: usize,
    phrase: String,
    category_id: String,
    confidence: f64,
}

impl PendingHighlight {
    fn overlaps(&self, other: &PendingHighlight) -> bool {
        self.start < other.end && other.start < self.end
    }

    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// The composed annotation engine
pub struct AnnotationEngine {
    fuzzy: FuzzyMatcher,
    extractor: PhraseExtractor,
    categorizer: SemanticCategorizer,
    seeds: Vec<CategorySeed>,

    corpus: RwLock<CorpusStats>,
    taxonomy: RwLock<Taxonomy>,
    learner: Mutex<BehaviorLearningEngine>,
    config: RwLock<EngineConfig>,

    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl AnnotationEngine {
    /// Engine with default configuration and in-memory persistence
    pub fn new(seeds: Vec<CategorySeed>) -> Self {
        EngineBuilder::new().with_taxonomy(seeds).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Run the full annotation pipeline over one document
    ///
    /// Never fails: malformed text yields however many highlights can be
    /// derived, and empty or whitespace-only input yields an empty list
    /// without touching any state.
    pub fn process(&self, text: &str) -> Vec<Highlight> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let config = match self.config.read() {
            Ok(config) => config.clone(),
            Err(_) => {
                warn!("Config lock poisoned; skipping document");
                return Vec::new();
            }
        };

        let corrected = self.fuzzy.correct(text);

        let candidates = match self.corpus.write() {
            Ok(mut stats) => self
                .extractor
                .extract(&corrected, &mut stats, config.pmi_scale),
            Err(_) => {
                warn!("Corpus lock poisoned; skipping document");
                return Vec::new();
            }
        };
        if candidates.is_empty() {
            return Vec::new();
        }

        // Base confidence: min-max of the batch's own score distribution.
        // Candidates are sorted by score descending.
        let score_max = candidates[0].score;
        let score_min = candidates[candidates.len() - 1].score;
        let normalize = |score: f64| -> f64 {
            if score_max > score_min {
                100.0 * (score - score_min) / (score_max - score_min)
            } else {
                100.0
            }
        };

        let sentences = segment(&corrected);

        // Locate word-boundary occurrences of each candidate; within one
        // candidate, occurrences are taken greedily left to right
        let mut located: Vec<(PendingHighlight, f64)> = Vec::new();
        for candidate in &candidates {
            let words: Vec<&str> = candidate.text.split(' ').collect();
            let n = words.len();
            for sentence in &sentences {
                let tokens = &sentence.tokens;
                let mut i = 0;
                while i + n <= tokens.len() {
                    let matches = tokens[i..i + n]
                        .iter()
                        .zip(&words)
                        .all(|(token, word)| token.text == **word);
                    if matches {
                        located.push((
                            PendingHighlight {
                                start: tokens[i].start,
                                end: tokens[i + n - 1].end,
                                phrase: candidate.text.clone(),
                                category_id: String::new(),
                                confidence: 0.0,
                            },
                            normalize(candidate.score),
                        ));
                        i += n;
                    } else {
                        i += 1;
                    }
                }
            }
        }

        // Categorize each occurrence and run the learning step under a
        // single taxonomy lock
        let mut categorized: Vec<(PendingHighlight, f64)> = Vec::new();
        match self.taxonomy.write() {
            Ok(mut taxonomy) => {
                for (mut pending, base) in located {
                    let context = context_window(
                        &corrected,
                        pending.start,
                        pending.end,
                        config.context_window_chars,
                    );
                    let Some(category_id) =
                        self.categorizer
                            .categorize(&pending.phrase, &context, &taxonomy)
                    else {
                        continue;
                    };
                    self.categorizer
                        .learn(&mut taxonomy, &category_id, &pending.phrase);
                    pending.category_id = category_id;
                    categorized.push((pending, base));
                }
            }
            Err(_) => {
                warn!("Taxonomy lock poisoned; skipping document");
                return Vec::new();
            }
        }

        // Confidence adjustment and show/suppress decisions
        let now = self.clock.now();
        let mut surviving: Vec<PendingHighlight> = Vec::new();
        if let Ok(mut learner) = self.learner.lock() {
            for (mut pending, base) in categorized {
                let decision =
                    learner.should_show(&pending.phrase, &pending.category_id, base, &config, now);
                if decision.show {
                    pending.confidence = decision.adjusted_confidence;
                    surviving.push(pending);
                }
            }
        }

        let mut resolved = resolve_overlaps(surviving);

        if let Some(cap) = config.max_highlights {
            if resolved.len() > cap {
                resolved.sort_by(|a, b| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.start.cmp(&b.start))
                });
                resolved.truncate(cap);
            }
        }

        // Every highlight the caller will see counts as shown
        if let Ok(mut learner) = self.learner.lock() {
            for pending in &resolved {
                learner.record_shown(&pending.phrase, &pending.category_id, &config, now);
            }
        }

        resolved.sort_by_key(|pending| pending.start);
        debug!("Produced {} highlights", resolved.len());

        resolved
            .into_iter()
            .map(|pending| Highlight {
                text: corrected[pending.start..pending.end].to_string(),
                start: pending.start,
                end: pending.end,
                category_id: pending.category_id,
                confidence: pending.confidence,
            })
            .collect()
    }

    /// UI feedback: the user clicked a highlight
    pub fn record_clicked(&self, phrase: &str, category_id: &str) {
        let Ok(config) = self.config.read().map(|c| c.clone()) else {
            return;
        };
        if let Ok(mut learner) = self.learner.lock() {
            learner.record_clicked(phrase, category_id, &config, self.clock.now());
        }
    }

    /// UI feedback: the user dismissed a highlight
    pub fn record_ignored(&self, phrase: &str, category_id: &str) {
        let Ok(config) = self.config.read().map(|c| c.clone()) else {
            return;
        };
        if let Ok(mut learner) = self.learner.lock() {
            learner.record_ignored(phrase, category_id, &config, self.clock.now());
        }
    }

    /// Explicit user correction: move a phrase between categories
    pub fn apply_correction(&self, phrase: &str, from_category: &str, to_category: &str) {
        if let Ok(mut taxonomy) = self.taxonomy.write() {
            self.categorizer.apply_correction(
                &mut taxonomy,
                phrase,
                from_category,
                to_category,
                self.clock.now(),
            );
        }
    }

    /// Read-only diagnostics across all three state buckets
    pub fn get_statistics(&self) -> EngineStatistics {
        let extractor = self
            .corpus
            .read()
            .map(|stats| ExtractorStatistics {
                total_documents: stats.total_documents,
                vocabulary_size: stats.vocabulary_size(),
                token_count: stats.token_count,
            })
            .unwrap_or(ExtractorStatistics {
                total_documents: 0,
                vocabulary_size: 0,
                token_count: 0,
            });

        let categorizer = self
            .taxonomy
            .read()
            .map(|taxonomy| CategorizerStatistics {
                category_count: taxonomy.len(),
                learned_phrase_count: taxonomy.learned_phrase_count(),
                correction_count: taxonomy.correction_count(),
            })
            .unwrap_or(CategorizerStatistics {
                category_count: 0,
                learned_phrase_count: 0,
                correction_count: 0,
            });

        let learner = self
            .learner
            .lock()
            .map(|learner| learner.stats())
            .unwrap_or_default();

        EngineStatistics {
            extractor,
            categorizer,
            learner,
        }
    }

    /// Apply a partial configuration update
    ///
    /// Invalid values reject only their own key; everything else in the
    /// patch still applies.
    pub fn configure(&self, patch: &ConfigPatch) -> ConfigOutcome {
        let Ok(mut config) = self.config.write() else {
            return ConfigOutcome::default();
        };
        let outcome = config.apply(patch);
        for rejected in &outcome.rejected {
            warn!(
                "Rejected configuration key '{}': {}",
                rejected.key, rejected.reason
            );
        }
        outcome
    }

    pub fn get_configuration(&self) -> EngineConfig {
        self.config
            .read()
            .map(|config| config.clone())
            .unwrap_or_default()
    }

    /// Destructive: drop all learned state and its persisted snapshots
    pub fn reset(&self) {
        info!("Resetting engine state");
        if let Ok(mut stats) = self.corpus.write() {
            *stats = CorpusStats::default();
        }
        if let Ok(mut taxonomy) = self.taxonomy.write() {
            *taxonomy = Taxonomy::from_seeds(&self.seeds);
        }
        if let Ok(mut learner) = self.learner.lock() {
            learner.clear();
        }
        for key in [KEY_CORPUS, KEY_TAXONOMY, KEY_INTERACTIONS] {
            if let Err(e) = self.store.remove(key) {
                warn!("Failed to remove '{}': {}", key, e);
            }
        }
    }

    /// Load persisted state, falling back to fresh defaults per bucket
    pub fn load(&self) {
        if let Ok(mut stats) = self.corpus.write() {
            *stats = storage::load_or_default(self.store.as_ref(), KEY_CORPUS);
        }
        if let Ok(mut taxonomy) = self.taxonomy.write() {
            let mut fresh = Taxonomy::from_seeds(&self.seeds);
            fresh.merge_learned(storage::load_or_default(self.store.as_ref(), KEY_TAXONOMY));
            *taxonomy = fresh;
        }
        if let Ok(mut learner) = self.learner.lock() {
            learner.restore(storage::load_or_default::<LearnerSnapshot>(
                self.store.as_ref(),
                KEY_INTERACTIONS,
            ));
        }
    }

    /// Write all state buckets to the store
    pub fn flush(&self) -> Result<()> {
        if let Ok(stats) = self.corpus.read() {
            storage::save(self.store.as_ref(), KEY_CORPUS, &*stats)?;
        }
        if let Ok(taxonomy) = self.taxonomy.read() {
            storage::save(self.store.as_ref(), KEY_TAXONOMY, &*taxonomy)?;
        }
        if let Ok(learner) = self.learner.lock() {
            storage::save(self.store.as_ref(), KEY_INTERACTIONS, &learner.snapshot())?;
        }
        debug!("Flushed engine state");
        Ok(())
    }
}

/// Resolve overlapping highlights: longer span wins, then higher
/// confidence, then earlier start; losers are discarded whole
fn resolve_overlaps(mut pending: Vec<PendingHighlight>) -> Vec<PendingHighlight> {
    pending.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut kept: Vec<PendingHighlight> = Vec::new();
    for candidate in pending {
        if !kept.iter().any(|k| k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }
    kept
}

/// Character-bounded context around an occurrence, occurrence excluded
fn context_window(text: &str, start: usize, end: usize, window_chars: usize) -> String {
    let before: String = text[..start]
        .chars()
        .rev()
        .take(window_chars)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = text[end..].chars().take(window_chars).collect();
    format!("{} {}", before.trim(), after.trim())
}

/// Builder for [`AnnotationEngine`]
pub struct EngineBuilder {
    dictionary: Vec<String>,
    seeds: Vec<CategorySeed>,
    stopwords: Option<StopwordFilter>,
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    random: Option<Box<dyn RandomSource>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            dictionary: Vec::new(),
            seeds: Vec::new(),
            stopwords: None,
            store: None,
            clock: None,
            random: None,
            config: EngineConfig::default(),
        }
    }

    /// Canonical dictionary for fuzzy correction
    pub fn with_dictionary<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dictionary = words.into_iter().map(Into::into).collect();
        self
    }

    /// Category seed-word configuration
    pub fn with_taxonomy(mut self, seeds: Vec<CategorySeed>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_stopwords(mut self, stopwords: StopwordFilter) -> Self {
        self.stopwords = Some(stopwords);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_random_source(mut self, random: Box<dyn RandomSource>) -> Self {
        self.random = Some(random);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the engine and load any persisted state
    pub fn build(self) -> AnnotationEngine {
        let stopwords = self.stopwords.unwrap_or_default();
        let taxonomy = Taxonomy::from_seeds(&self.seeds);

        let engine = AnnotationEngine {
            fuzzy: FuzzyMatcher::new(&self.dictionary),
            extractor: PhraseExtractor::new(stopwords),
            categorizer: SemanticCategorizer::new(),
            seeds: self.seeds,
            corpus: RwLock::new(CorpusStats::default()),
            taxonomy: RwLock::new(taxonomy),
            learner: Mutex::new(BehaviorLearningEngine::new(
                self.random.unwrap_or_else(default_source),
            )),
            config: RwLock::new(self.config),
            store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };
        engine.load();
        engine
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds() -> Vec<CategorySeed> {
        vec![
            CategorySeed::new("lighting", "Lighting", &["light", "shadow", "glow"]),
            CategorySeed::new("composition", "Composition", &["depth", "field", "frame"]),
        ]
    }

    fn engine() -> AnnotationEngine {
        EngineBuilder::new()
            .with_taxonomy(seeds())
            .with_random_source(crate::learner::seeded_source(42))
            .build()
    }

    #[test]
    fn test_empty_input_no_mutation() {
        let engine = engine();
        assert!(engine.process("").is_empty());
        assert!(engine.process("   \n  ").is_empty());
        assert_eq!(engine.get_statistics().extractor.total_documents, 0);
    }

    #[test]
    fn test_highlights_sorted_and_non_overlapping() {
        let engine = engine();
        let highlights =
            engine.process("golden hour lighting creates soft shadow play in the frame");

        for pair in highlights.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }

    #[test]
    fn test_highlight_text_matches_offsets() {
        let engine = engine();
        let text = "Soft shadow play under golden light";
        for highlight in engine.process(text) {
            assert_eq!(&text[highlight.start..highlight.end], highlight.text);
            assert!((0.0..=100.0).contains(&highlight.confidence));
        }
    }

    #[test]
    fn test_resolver_prefers_longer_span() {
        let resolved = resolve_overlaps(vec![
            PendingHighlight {
                start: 0,
                end: 14,
                phrase: "depth of field".into(),
                category_id: "composition".into(),
                confidence: 60.0,
            },
            PendingHighlight {
                start: 6,
                end: 14,
                phrase: "of field".into(),
                category_id: "composition".into(),
                confidence: 90.0,
            },
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].phrase, "depth of field");
    }

    #[test]
    fn test_resolver_tie_breaks_confidence_then_start() {
        let resolved = resolve_overlaps(vec![
            PendingHighlight {
                start: 0,
                end: 5,
                phrase: "a".into(),
                category_id: "x".into(),
                confidence: 50.0,
            },
            PendingHighlight {
                start: 3,
                end: 8,
                phrase: "b".into(),
                category_id: "x".into(),
                confidence: 70.0,
            },
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].phrase, "b");
    }

    #[test]
    fn test_max_highlights_cap() {
        let engine = EngineBuilder::new()
            .with_taxonomy(seeds())
            .with_config(EngineConfig {
                max_highlights: Some(1),
                min_confidence: 0.0,
                exploration_rate: 0.0,
                ..Default::default()
            })
            .build();

        let highlights = engine.process("light and shadow shape the depth of field");
        assert!(highlights.len() <= 1);
    }

    #[test]
    fn test_context_window_excludes_occurrence() {
        let window = context_window("aaa bbb ccc", 4, 7, 100);
        assert_eq!(window, "aaa ccc");
    }

    #[test]
    fn test_context_window_char_bounded() {
        let window = context_window("0123456789 xx 0123456789", 11, 13, 4);
        assert_eq!(window, "789 012");
    }

    #[test]
    fn test_configure_rejects_bad_keys() {
        let engine = engine();
        let outcome = engine.configure(&ConfigPatch {
            exploration_rate: Some(2.0),
            min_confidence: Some(60.0),
            ..Default::default()
        });

        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(engine.get_configuration().exploration_rate, 0.15);
        assert_eq!(engine.get_configuration().min_confidence, 60.0);
    }

    #[test]
    fn test_configure_empty_patch_is_idempotent() {
        let engine = engine();
        let before = engine.get_configuration();
        engine.configure(&ConfigPatch::default());
        assert_eq!(engine.get_configuration(), before);
    }

    proptest::proptest! {
        #[test]
        fn prop_highlights_never_overlap(
            words in proptest::collection::vec(
                proptest::sample::select(vec![
                    "light", "shadow", "depth", "field", "frame", "golden",
                    "hour", "soft", "play", "the", "of", "a",
                ]),
                0..25,
            )
        ) {
            let engine = EngineBuilder::new()
                .with_taxonomy(seeds())
                .with_random_source(crate::learner::seeded_source(1))
                .with_config(EngineConfig {
                    min_confidence: 0.0,
                    ..Default::default()
                })
                .build();

            let text = words.join(" ");
            let highlights = engine.process(&text);

            for (i, a) in highlights.iter().enumerate() {
                for b in &highlights[i + 1..] {
                    proptest::prop_assert!(!a.overlaps(b));
                }
            }
            for pair in highlights.windows(2) {
                proptest::prop_assert!(pair[0].start <= pair[1].start);
            }
        }
    }

    #[test]
    fn test_reset_clears_state() {
        let engine = engine();
        engine.process("golden hour lighting creates soft shadow play");
        engine.flush().unwrap();
        assert!(engine.get_statistics().extractor.total_documents > 0);

        engine.reset();
        let stats = engine.get_statistics();
        assert_eq!(stats.extractor.total_documents, 0);
        assert_eq!(stats.learner.record_count, 0);
        // Seed categories survive a reset
        assert_eq!(stats.categorizer.category_count, 2);
    }
}
