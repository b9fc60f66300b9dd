//! Test fixtures for Quarry: a scripted language model, a Northwind-shaped
//! SQLite dataset with known answers, and the fixture document corpus.
//!
//! Helpers panic on setup failure; they are only used from tests.

pub mod model;
pub mod northwind;

use std::path::PathBuf;

use quarry_core::models::Question;
use serde::de::DeserializeOwned;

pub use model::ScriptedModel;
pub use northwind::NorthwindDb;

/// Root directory of the fixture data.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Absolute path to a fixture file.
pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_root().join(relative_path)
}

pub fn fixture_exists(relative_path: &str) -> bool {
    fixture_path(relative_path).exists()
}

/// Directory holding the fixture markdown corpus.
pub fn docs_dir() -> PathBuf {
    fixture_path("docs")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixture_path(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Load a JSONL batch of questions.
pub fn load_batch(relative_path: &str) -> Vec<Question> {
    let path = fixture_path(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read batch {}: {}", path.display(), e));
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l)
                .unwrap_or_else(|e| panic!("Bad batch line in {}: {}", path.display(), e))
        })
        .collect()
}

/// The six-question sample batch.
pub fn sample_batch() -> Vec<Question> {
    load_batch("batches/sample_questions.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::models::FormatHint;

    #[test]
    fn corpus_documents_exist() {
        for doc in [
            "docs/marketing_calendar.md",
            "docs/kpi_definitions.md",
            "docs/catalog.md",
            "docs/product_policy.md",
        ] {
            assert!(fixture_exists(doc), "Missing fixture: {doc}");
        }
    }

    #[test]
    fn sample_batch_parses_with_typed_hints() {
        let batch = sample_batch();
        assert_eq!(batch.len(), 6);
        assert_eq!(batch[0].format_hint, FormatHint::Int);
        assert!(matches!(batch[3].format_hint, FormatHint::List(ref f) if f.len() == 2));
    }
}
