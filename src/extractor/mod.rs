//! Statistical phrase extraction
//!
//! Generates 1-4 word n-grams per sentence and ranks them with TF-IDF,
//! boosted by pointwise mutual information for multi-word collocations.
//! Scoring reads the corpus statistics as they stood when the document
//! arrived; the document is folded into the corpus afterwards, so
//! identical `(text, stats)` inputs always produce identical output.

pub mod corpus;
pub mod stopwords;
pub mod tokenizer;

use crate::types::PhraseCandidate;
use rustc_hash::FxHashMap;
use tracing::debug;

pub use corpus::CorpusStats;
pub use stopwords::StopwordFilter;
pub use tokenizer::{segment, token_count, Sentence, Token};

/// Longest n-gram generated
pub const MAX_NGRAM: usize = 4;

/// Extracts and scores candidate phrases from one document
#[derive(Debug, Clone)]
pub struct PhraseExtractor {
    stopwords: StopwordFilter,
}

impl Default for PhraseExtractor {
    fn default() -> Self {
        Self::new(StopwordFilter::default())
    }
}

/// One document's term tallies before they are folded into the corpus
struct DocumentTerms {
    /// Occurrence count per distinct term (all n-gram lengths)
    counts: FxHashMap<String, u64>,

    /// Candidate phrase -> n-gram length
    candidates: FxHashMap<String, usize>,

    /// Total unigram occurrences, including stopwords
    token_total: u64,

    /// Total bigram occurrences
    bigram_total: u64,
}

impl PhraseExtractor {
    pub fn new(stopwords: StopwordFilter) -> Self {
        Self { stopwords }
    }

    pub fn stopwords(&self) -> &StopwordFilter {
        &self.stopwords
    }

    /// Extract candidates from `text`, scored against the incoming
    /// `stats`, then fold the document into `stats`.
    ///
    /// Returns candidates sorted by score descending (ties by text
    /// ascending). Empty or token-free text returns an empty vec and
    /// leaves `stats` untouched.
    pub fn extract(
        &self,
        text: &str,
        stats: &mut CorpusStats,
        pmi_scale: f64,
    ) -> Vec<PhraseCandidate> {
        let sentences = tokenizer::segment(text);
        let doc = self.collect_terms(&sentences);
        if doc.token_total == 0 {
            return Vec::new();
        }

        let (unigram_vocab, bigram_vocab) = stats.vocab_breakdown();
        let mut candidates: Vec<PhraseCandidate> = doc
            .candidates
            .iter()
            .map(|(text, &ngram_len)| {
                let count = doc.counts[text];
                let tf = count as f64 / doc.token_total as f64;
                let idf = (1.0 + stats.total_documents as f64).ln()
                    - (1.0 + stats.document_frequency_of(text) as f64).ln()
                    + 1.0;

                let pmi = (ngram_len >= 2)
                    .then(|| average_pmi(text, stats, unigram_vocab, bigram_vocab));

                // Positive PMI boosts collocations; PMI <= 0 demotes to a
                // plain TF-IDF score, never discards
                let score = match pmi {
                    Some(pmi) => tf * idf * (1.0 + pmi.max(0.0) / pmi_scale),
                    None => tf * idf,
                };

                PhraseCandidate {
                    text: text.clone(),
                    ngram_len,
                    tf,
                    idf,
                    pmi,
                    score,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.text.cmp(&b.text))
        });

        stats.record_document(&doc.counts, doc.token_total, doc.bigram_total);
        debug!(
            "Extracted {} candidates from {} tokens (corpus now {} docs)",
            candidates.len(),
            doc.token_total,
            stats.total_documents
        );

        candidates
    }

    /// Tally every 1-4 token n-gram per sentence
    fn collect_terms(&self, sentences: &[Sentence]) -> DocumentTerms {
        let mut doc = DocumentTerms {
            counts: FxHashMap::default(),
            candidates: FxHashMap::default(),
            token_total: 0,
            bigram_total: 0,
        };

        for sentence in sentences {
            let tokens = &sentence.tokens;
            doc.token_total += tokens.len() as u64;
            doc.bigram_total += tokens.len().saturating_sub(1) as u64;

            for n in 1..=MAX_NGRAM.min(tokens.len()) {
                for window in tokens.windows(n) {
                    let term = join_words(window);
                    *doc.counts.entry(term.clone()).or_insert(0) += 1;

                    // Unigram candidates skip stopwords; multi-word
                    // phrases keep them ("depth of field")
                    let is_candidate = n > 1 || !self.stopwords.is_stopword(&window[0].text);
                    if is_candidate {
                        doc.candidates.entry(term).or_insert(n);
                    }
                }
            }
        }

        doc
    }
}

/// PMI averaged over adjacent word pairs, Laplace-smoothed so it is
/// defined even on the first-ever document
fn average_pmi(phrase: &str, stats: &CorpusStats, unigram_vocab: u64, bigram_vocab: u64) -> f64 {
    let words: Vec<&str> = phrase.split(' ').collect();
    if words.len() < 2 {
        return 0.0;
    }

    let pair_count = (words.len() - 1) as f64;
    let sum: f64 = words
        .windows(2)
        .map(|pair| pair_pmi(pair[0], pair[1], stats, unigram_vocab, bigram_vocab))
        .sum();
    sum / pair_count
}

fn pair_pmi(w1: &str, w2: &str, stats: &CorpusStats, unigram_vocab: u64, bigram_vocab: u64) -> f64 {
    let p1 = smoothed(stats.frequency_of(w1), stats.token_count, unigram_vocab);
    let p2 = smoothed(stats.frequency_of(w2), stats.token_count, unigram_vocab);
    let joint = smoothed(
        stats.frequency_of(&format!("{} {}", w1, w2)),
        stats.bigram_count,
        bigram_vocab,
    );
    (joint / (p1 * p2)).ln()
}

/// Laplace-smoothed probability; the +1 vocabulary slot keeps the
/// denominator positive on an empty corpus
fn smoothed(count: u64, total: u64, vocab: u64) -> f64 {
    (count as f64 + 1.0) / (total as f64 + vocab as f64 + 1.0)
}

fn join_words(tokens: &[Token]) -> String {
    let mut term = String::with_capacity(tokens.iter().map(|t| t.text.len() + 1).sum());
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            term.push(' ');
        }
        term.push_str(&token.text);
    }
    term
}
