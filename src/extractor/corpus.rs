//! Corpus-wide term statistics
//!
//! Monotonically growing counters shared by every document the engine
//! processes. Loaded at engine startup, updated once per processed
//! document, and flushed afterwards. Processing the same document twice
//! double-counts by design: each call represents one real document view.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Process-wide corpus statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Documents processed so far
    pub total_documents: u64,

    /// How many documents each term appeared in
    pub document_frequency: FxHashMap<String, u64>,

    /// Total occurrences of each term across all documents
    pub total_frequency: FxHashMap<String, u64>,

    /// Total unigram occurrences (including stopwords), for PMI
    pub token_count: u64,

    /// Total bigram occurrences, for PMI
    pub bigram_count: u64,
}

impl CorpusStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents a term appeared in
    pub fn document_frequency_of(&self, term: &str) -> u64 {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// Total occurrences of a term
    pub fn frequency_of(&self, term: &str) -> u64 {
        self.total_frequency.get(term).copied().unwrap_or(0)
    }

    /// Number of distinct terms tracked
    pub fn vocabulary_size(&self) -> usize {
        self.total_frequency.len()
    }

    /// Distinct unigram and bigram vocabulary sizes
    pub fn vocab_breakdown(&self) -> (u64, u64) {
        let mut unigrams = 0;
        let mut bigrams = 0;
        for term in self.total_frequency.keys() {
            match term.bytes().filter(|&b| b == b' ').count() {
                0 => unigrams += 1,
                1 => bigrams += 1,
                _ => {}
            }
        }
        (unigrams, bigrams)
    }

    /// Fold one document's term counts into the corpus
    ///
    /// `term_counts` maps each distinct term to its occurrence count in
    /// the document. `tokens` and `bigrams` are the document's unigram
    /// and bigram occurrence totals.
    pub fn record_document(
        &mut self,
        term_counts: &FxHashMap<String, u64>,
        tokens: u64,
        bigrams: u64,
    ) {
        self.total_documents += 1;
        self.token_count += tokens;
        self.bigram_count += bigrams;

        for (term, &count) in term_counts {
            *self.document_frequency.entry(term.clone()).or_insert(0) += 1;
            *self.total_frequency.entry(term.clone()).or_insert(0) += count;
        }
    }
}
