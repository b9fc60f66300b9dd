//! Route decision: which capabilities a question needs.

use serde::{Deserialize, Serialize};

/// Exactly one route per question. There is no "unknown" variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    RetrievalOnly,
    QueryOnly,
    Hybrid,
}

impl RouteDecision {
    pub fn needs_retrieval(self) -> bool {
        matches!(self, Self::RetrievalOnly | Self::Hybrid)
    }

    pub fn needs_query(self) -> bool {
        matches!(self, Self::QueryOnly | Self::Hybrid)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RetrievalOnly => "retrieval_only",
            Self::QueryOnly => "query_only",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parse a route label out of free model text.
    ///
    /// Accepts the canonical names and the short labels `rag`, `sql`, `hybrid`.
    /// When several labels occur the earliest one wins. Returns `None` when no
    /// label is present.
    pub fn parse_label(text: &str) -> Option<Self> {
        const LABELS: &[(&str, RouteDecision)] = &[
            ("retrieval_only", RouteDecision::RetrievalOnly),
            ("retrieval-only", RouteDecision::RetrievalOnly),
            ("query_only", RouteDecision::QueryOnly),
            ("query-only", RouteDecision::QueryOnly),
            ("hybrid", RouteDecision::Hybrid),
            ("rag", RouteDecision::RetrievalOnly),
            ("sql", RouteDecision::QueryOnly),
        ];
        let lower = text.to_ascii_lowercase();
        LABELS
            .iter()
            .filter_map(|(label, route)| find_word(&lower, label).map(|pos| (pos, *route)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, route)| route)
    }
}

/// Position of `word` in `haystack` bounded by non-alphanumeric characters.
fn find_word(haystack: &str, word: &str) -> Option<usize> {
    haystack.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_labels() {
        assert_eq!(RouteDecision::parse_label("rag"), Some(RouteDecision::RetrievalOnly));
        assert_eq!(RouteDecision::parse_label("Route: SQL"), Some(RouteDecision::QueryOnly));
        assert_eq!(RouteDecision::parse_label("hybrid."), Some(RouteDecision::Hybrid));
    }

    #[test]
    fn ignores_labels_inside_words() {
        assert_eq!(RouteDecision::parse_label("sqlite drag"), None);
    }

    #[test]
    fn earliest_label_wins() {
        assert_eq!(
            RouteDecision::parse_label("hybrid, not sql"),
            Some(RouteDecision::Hybrid)
        );
    }
}
