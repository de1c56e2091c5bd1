//! Sentence-aware tokenization with byte offsets
//!
//! Splits text into sentences, then each sentence into lowercase word
//! tokens that remember their byte span in the source. Downstream n-gram
//! generation never crosses a sentence boundary, and occurrence location
//! reuses the same spans so highlights always land on word boundaries.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence terminators; newlines end a sentence too
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?\n]+").expect("valid sentence boundary pattern"));

/// A single lowercase token with its byte span in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A sentence as a run of tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub tokens: Vec<Token>,
}

impl Sentence {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Segment text into sentences of offset-carrying tokens
pub fn segment(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut cursor = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        push_sentence(&mut sentences, text, cursor, boundary.start());
        cursor = boundary.end();
    }
    push_sentence(&mut sentences, text, cursor, text.len());

    sentences
}

/// Total token count across sentences
pub fn token_count(sentences: &[Sentence]) -> usize {
    sentences.iter().map(|s| s.tokens.len()).sum()
}

fn push_sentence(sentences: &mut Vec<Sentence>, text: &str, start: usize, end: usize) {
    let tokens = tokenize_span(&text[start..end], start);
    if !tokens.is_empty() {
        sentences.push(Sentence { tokens });
    }
}

/// Tokenize a slice, offsetting spans by the slice's position
fn tokenize_span(slice: &str, base: usize) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut word_start = 0;

    for (i, ch) in slice.char_indices() {
        if ch.is_alphanumeric() {
            if word.is_empty() {
                word_start = i;
            }
            word.extend(ch.to_lowercase());
        } else if !word.is_empty() {
            tokens.push(Token {
                text: std::mem::take(&mut word),
                start: base + word_start,
                end: base + i,
            });
        }
    }
    if !word.is_empty() {
        tokens.push(Token {
            text: word,
            start: base + word_start,
            end: base + slice.len(),
        });
    }

    tokens
}
