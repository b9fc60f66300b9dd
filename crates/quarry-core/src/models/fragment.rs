//! Document fragments and ranked fragment sets.

use serde::{Deserialize, Serialize};

/// A paragraph-level span of a corpus document with a stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Source document identifier (file stem).
    pub document: String,
    /// Index of the fragment within its document.
    pub index: usize,
    pub text: String,
}

impl Fragment {
    /// Citation identifier: `<document>::chunk<N>`.
    pub fn id(&self) -> String {
        format!("{}::chunk{}", self.document, self.index)
    }

    /// First line of the fragment with markdown heading markers stripped.
    pub fn title(&self) -> &str {
        self.text
            .lines()
            .next()
            .unwrap_or("")
            .trim_start_matches('#')
            .trim()
    }
}

/// A fragment with its relevance score and original corpus position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFragment {
    pub fragment: Fragment,
    pub score: f64,
    /// Position in the corpus; the tie-break key.
    pub position: usize,
}

/// Top-K fragments for one question.
///
/// Invariant: scores are non-increasing; equal scores keep corpus order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedFragmentSet {
    entries: Vec<RankedFragment>,
}

impl RankedFragmentSet {
    /// Build from entries already in ranked order.
    pub fn from_ranked(entries: Vec<RankedFragment>) -> Self {
        debug_assert!(Self::is_ordered(&entries));
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedFragment> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.fragment.id()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&RankedFragment> {
        self.entries.iter().find(|e| e.fragment.id() == id)
    }

    /// Scores non-increasing, ties in ascending corpus position.
    pub fn is_ordered(entries: &[RankedFragment]) -> bool {
        entries.windows(2).all(|w| {
            w[0].score > w[1].score || (w[0].score == w[1].score && w[0].position < w[1].position)
        })
    }
}
