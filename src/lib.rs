//! Theia - Self-Learning Semantic Text Annotation
//!
//! A text-annotation engine that finds statistically significant phrases
//! in free-form text, assigns each occurrence a semantic category from
//! seeded taxonomies, and adapts its confidence in every (phrase,
//! category) pairing from implicit user feedback:
//! - TF-IDF + PMI phrase extraction over persisted corpus statistics
//! - Seed-word, learned-affinity, and context-window categorization
//! - Reinforcement-style confidence learning with epsilon-greedy
//!   exploration and time decay
//! - Deterministic, side-effect-bounded pipeline with versioned
//!   key-value snapshots
//!
//! # Architecture
//!
//! The pipeline composes four components, leaves first:
//! - **FuzzyMatcher**: near-miss spelling correction against a static
//!   dictionary
//! - **PhraseExtractor**: candidate n-gram extraction and scoring
//! - **SemanticCategorizer**: category assignment with a learning step
//! - **BehaviorLearningEngine**: feedback-driven confidence adjustment
//!
//! The [`AnnotationEngine`] orchestrates them per document and owns the
//! load/flush lifecycle of all learned state, so independent engine
//! instances stay isolated and tests can inject fresh state.
//!
//! # Example
//!
//! ```
//! use theia_core::{AnnotationEngine, CategorySeed, EngineBuilder};
//!
//! let engine = EngineBuilder::new()
//!     .with_taxonomy(vec![CategorySeed::new(
//!         "lighting",
//!         "Lighting",
//!         &["light", "shadow", "glow"],
//!     )])
//!     .with_dictionary(["bokeh", "aperture"])
//!     .build();
//!
//! let highlights = engine.process("golden hour lighting creates soft shadow play");
//! for h in &highlights {
//!     println!("{} [{}] {:.0}", h.text, h.category_id, h.confidence);
//! }
//!
//! // Feedback adapts future confidence
//! if let Some(h) = highlights.first() {
//!     engine.record_clicked(&h.text, &h.category_id);
//! }
//! ```

pub mod categorizer;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod fuzzy;
pub mod learner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use categorizer::{Category, CategorySeed, CorrectionRecord, SemanticCategorizer, Taxonomy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigOutcome, ConfigPatch, EngineConfig};
pub use engine::{AnnotationEngine, EngineBuilder, EngineStatistics};
pub use error::{Result, TheiaError};
pub use extractor::{CorpusStats, PhraseExtractor, StopwordFilter};
pub use fuzzy::FuzzyMatcher;
pub use learner::{BehaviorLearningEngine, Decision, InteractionRecord, RandomSource};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use types::{Highlight, PhraseCandidate};
