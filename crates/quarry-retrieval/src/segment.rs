//! Paragraph segmentation of markdown documents.

use quarry_core::config::RetrievalConfig;
use quarry_core::models::Fragment;

/// Bounds on fragment length, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Sections of this length or shorter are dropped.
    pub min_chars: usize,
    /// Longer sections are split on whitespace.
    pub max_chars: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self::from_config(&RetrievalConfig::default())
    }
}

impl SegmentOptions {
    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            min_chars: config.effective_min_fragment_chars(),
            max_chars: config.effective_max_fragment_chars(),
        }
    }
}

/// Split one document into fragments.
///
/// Sections break at blank lines and before heading lines (`#`). Each
/// retained fragment gets the next index within `document`.
pub fn segment(document: &str, text: &str, options: SegmentOptions) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for section in sections(text) {
        for piece in split_long(&section, options.max_chars) {
            if piece.chars().count() > options.min_chars {
                fragments.push(Fragment {
                    document: document.to_string(),
                    index: fragments.len(),
                    text: piece,
                });
            }
        }
    }
    fragments
}

fn sections(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut flush = |current: &mut Vec<&str>| {
        let joined = current.join("\n");
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        current.clear();
    };
    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut current);
            continue;
        }
        if line.starts_with('#') {
            flush(&mut current);
        }
        current.push(line);
    }
    flush(&mut current);
    out
}

fn split_long(section: &str, max_chars: usize) -> Vec<String> {
    if section.chars().count() <= max_chars {
        return vec![section.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in section.split_whitespace() {
        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed > max_chars && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
