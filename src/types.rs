//! Core data structures shared across the annotation pipeline

use serde::{Deserialize, Serialize};

/// A scored candidate phrase extracted from one document
///
/// Ephemeral: candidates live for a single `process()` call and are
/// re-derived every time. Scores are computed against the corpus
/// statistics as they stood when the document arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseCandidate {
    /// Normalized (lowercased, space-joined) phrase text
    pub text: String,

    /// Number of words in the phrase (1..=4)
    pub ngram_len: usize,

    /// Term frequency within the document
    pub tf: f64,

    /// Laplace-smoothed inverse document frequency
    pub idf: f64,

    /// Pointwise mutual information over constituent words
    /// (`None` for unigrams)
    pub pmi: Option<f64>,

    /// Combined ranking score
    pub score: f64,
}

/// An annotated span of the corrected input text
///
/// Offsets are byte indices into the corrected text. Highlights are
/// always re-derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Start byte offset (inclusive)
    pub start: usize,

    /// End byte offset (exclusive)
    pub end: usize,

    /// The highlighted text slice
    pub text: String,

    /// Assigned category id
    pub category_id: String,

    /// Confidence score in [0, 100]
    pub confidence: f64,
}

impl Highlight {
    /// Length of the highlighted span in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether two highlights cover intersecting byte ranges
    pub fn overlaps(&self, other: &Highlight) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Key identifying an interaction record: normalized phrase + category
pub fn interaction_key(phrase: &str, category_id: &str) -> String {
    format!("{}\u{1f}{}", phrase.to_lowercase(), category_id)
}
