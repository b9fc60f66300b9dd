//! Tokenization shared by indexing and querying.
//!
//! Tokens are lower-cased runs of word characters (`\w+`). Stop words from
//! [`STOP_WORDS`] are removed on both sides so that question phrasing
//! ("What is the ...") does not contribute to relevance.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("word regex is valid"));

/// Fixed English stop-word list. Sorted; searched with binary search.
pub const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "by", "can", "did",
    "do", "does", "during", "each", "for", "from", "had", "has", "have", "how", "i", "in", "into",
    "is", "it", "its", "me", "of", "on", "or", "our", "per", "should", "so", "than", "that", "the",
    "their", "them", "then", "there", "these", "this", "those", "to", "was", "we", "were", "what",
    "when", "where", "which", "who", "will", "with", "you", "your",
];

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.binary_search(&token).is_ok()
}

/// All lower-cased word tokens, stop words included.
pub fn words(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Tokens used for ranking: lower-cased, stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    words(text).into_iter().filter(|t| !is_stop_word(t)).collect()
}

/// Distinct ranking tokens, sorted. Used for coverage and cache keys.
pub fn distinct_terms(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}
