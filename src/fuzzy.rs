//! Near-miss spelling correction against a static dictionary
//!
//! Corrects tokens that are close misspellings of known domain terms
//! before extraction runs, so "bokhe effect" feeds the pipeline as
//! "bokeh effect". Matching is conservative: a substitution is accepted
//! only within a bounded edit distance relative to the token length, and
//! ties resolve deterministically.
//!
//! Candidate lookup is narrowed by a length/first-letter index and
//! memoized per token in an LRU cache, since real inputs repeat the same
//! misspellings constantly.

use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

/// Maximum accepted edit distance
const MAX_DISTANCE: usize = 2;

/// Maximum accepted distance-to-length ratio
const MAX_DISTANCE_RATIO: f64 = 0.34;

/// Dictionary entries considered per token: within this many characters
/// of the token length
const LENGTH_BAND: usize = 2;

/// Correction cache capacity
const CACHE_CAPACITY: usize = 512;

/// Corrects near-miss spellings against a fixed dictionary
pub struct FuzzyMatcher {
    /// All dictionary words, lowercase
    words: FxHashSet<String>,

    /// Words grouped by (length, first letter); each bucket sorted for
    /// deterministic iteration
    index: FxHashMap<(usize, char), Vec<String>>,

    /// Memoized lookup results per lowercase token
    cache: Mutex<LruCache<String, Option<String>>>,
}

impl FuzzyMatcher {
    /// Build a matcher over the given dictionary words
    pub fn new<I, S>(dictionary: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = FxHashSet::default();
        let mut index: FxHashMap<(usize, char), Vec<String>> = FxHashMap::default();

        for word in dictionary {
            let word = word.as_ref().to_lowercase();
            let Some(first) = word.chars().next() else {
                continue;
            };
            if words.insert(word.clone()) {
                index
                    .entry((word.chars().count(), first))
                    .or_default()
                    .push(word);
            }
        }

        for bucket in index.values_mut() {
            bucket.sort_unstable();
        }

        Self {
            words,
            index,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("nonzero capacity"),
            )),
        }
    }

    /// Matcher that corrects nothing
    pub fn empty() -> Self {
        Self::new(std::iter::empty::<&str>())
    }

    /// Number of dictionary entries
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Correct each near-miss token in `text`, leaving everything else
    /// (spacing, punctuation, unknown words) untouched
    pub fn correct(&self, text: &str) -> String {
        if self.words.is_empty() || text.is_empty() {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut token = String::new();

        for ch in text.chars() {
            if ch.is_alphabetic() {
                token.push(ch);
            } else {
                if !token.is_empty() {
                    self.push_corrected(&mut result, &token);
                    token.clear();
                }
                result.push(ch);
            }
        }
        if !token.is_empty() {
            self.push_corrected(&mut result, &token);
        }

        result
    }

    fn push_corrected(&self, out: &mut String, token: &str) {
        match self.lookup(token) {
            Some(corrected) => out.push_str(&match_case(token, &corrected)),
            None => out.push_str(token),
        }
    }

    /// Find the dictionary correction for a single token, if a safe one
    /// exists. Tokens already in the dictionary need no correction.
    pub fn lookup(&self, token: &str) -> Option<String> {
        let lower = token.to_lowercase();
        if self.words.contains(&lower) {
            return None;
        }

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&lower) {
                return cached.clone();
            }
        }

        let found = self.search(&lower);
        if let Some(ref corrected) = found {
            debug!("Fuzzy-corrected '{}' -> '{}'", token, corrected);
        }

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(lower, found.clone());
        }
        found
    }

    fn search(&self, token: &str) -> Option<String> {
        let first = token.chars().next()?;
        let token_len = token.chars().count();
        let max_distance = MAX_DISTANCE.min((token_len as f64 * MAX_DISTANCE_RATIO) as usize);
        if max_distance == 0 {
            return None;
        }

        let mut best: Option<(usize, &String)> = None;

        let lo = token_len.saturating_sub(LENGTH_BAND);
        for len in lo..=token_len + LENGTH_BAND {
            let Some(bucket) = self.index.get(&(len, first)) else {
                continue;
            };
            for word in bucket {
                let distance = edit_distance(token, word);
                if distance > max_distance {
                    continue;
                }
                // Buckets are sorted, so on equal distance the earlier
                // (lexicographically smaller) word wins
                let better = match best {
                    None => true,
                    Some((best_distance, best_word)) => {
                        distance < best_distance
                            || (distance == best_distance && word < best_word)
                    }
                };
                if better {
                    best = Some((distance, word));
                }
            }
        }

        best.map(|(_, word)| word.clone())
    }
}

/// Edit distance with adjacent transpositions counted as one edit
/// (optimal string alignment)
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(matrix[i - 2][j - 2] + 1);
            }
            matrix[i][j] = d;
        }
    }

    matrix[a.len()][b.len()]
}

/// Carry the original token's leading-capital casing onto the correction
fn match_case(original: &str, corrected: &str) -> String {
    let leading_upper = original
        .chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false);

    if leading_upper {
        let mut chars = corrected.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        corrected.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photography_matcher() -> FuzzyMatcher {
        FuzzyMatcher::new(["bokeh", "aperture", "exposure", "vignette", "tripod"])
    }

    #[test]
    fn test_edit_distance_basics() {
        assert_eq!(edit_distance("hello", "hello"), 0);
        assert_eq!(edit_distance("hello", "helo"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
    }

    #[test]
    fn test_edit_distance_transposition() {
        // Adjacent swap is a single edit
        assert_eq!(edit_distance("bokhe", "bokeh"), 1);
        assert_eq!(edit_distance("apreture", "aperture"), 1);
    }

    #[test]
    fn test_corrects_near_miss() {
        let matcher = photography_matcher();
        assert_eq!(matcher.correct("bokhe effect"), "bokeh effect");
    }

    #[test]
    fn test_dictionary_words_untouched() {
        let matcher = photography_matcher();
        assert_eq!(matcher.correct("bokeh and aperture"), "bokeh and aperture");
    }

    #[test]
    fn test_unknown_words_untouched() {
        let matcher = photography_matcher();
        // "sunset" is nowhere near any entry
        assert_eq!(matcher.correct("a sunset photo"), "a sunset photo");
    }

    #[test]
    fn test_distance_ratio_guards_short_tokens() {
        let matcher = FuzzyMatcher::new(["bokeh"]);
        // "bo" is within the length band but 3 edits away, and short
        // tokens allow no edits at all (2 * 0.34 < 1)
        assert_eq!(matcher.correct("bo"), "bo");
    }

    #[test]
    fn test_first_letter_must_match() {
        let matcher = FuzzyMatcher::new(["bokeh"]);
        // One substitution away, but the first letter differs
        assert_eq!(matcher.correct("cokeh"), "cokeh");
    }

    #[test]
    fn test_tie_breaks_lexicographically() {
        let matcher = FuzzyMatcher::new(["card", "cart"]);
        // "carp" is distance 1 from both; "card" < "cart"
        assert_eq!(matcher.lookup("carp"), Some("card".to_string()));
    }

    #[test]
    fn test_preserves_leading_capital() {
        let matcher = photography_matcher();
        assert_eq!(matcher.correct("Bokhe shot"), "Bokeh shot");
    }

    #[test]
    fn test_preserves_punctuation_and_spacing() {
        let matcher = photography_matcher();
        assert_eq!(
            matcher.correct("bokhe, vignete!  done"),
            "bokeh, vignette!  done"
        );
    }

    #[test]
    fn test_empty_dictionary_is_identity() {
        let matcher = FuzzyMatcher::empty();
        assert_eq!(matcher.correct("anything at all"), "anything at all");
    }

    #[test]
    fn test_repeated_lookups_consistent() {
        let matcher = photography_matcher();
        // Second call is served from cache; result must be identical
        assert_eq!(matcher.lookup("bokhe"), Some("bokeh".to_string()));
        assert_eq!(matcher.lookup("bokhe"), Some("bokeh".to_string()));
    }
}
