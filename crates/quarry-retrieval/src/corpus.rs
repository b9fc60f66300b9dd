//! The static, in-memory fragment collection.

use std::path::{Path, PathBuf};

use quarry_core::errors::CorpusError;
use quarry_core::models::Fragment;
use tracing::{debug, info};

use crate::segment::{segment, SegmentOptions};

/// Immutable fragment collection built once at startup.
///
/// Fragment order is corpus order: documents in sorted path order,
/// fragments in document order. Ranking ties resolve by this order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    fragments: Vec<Fragment>,
}

impl Corpus {
    /// Load every `*.md` file directly under `dir`.
    ///
    /// A missing directory or a directory yielding no fragments is an error:
    /// retrieval would be impossible for every question.
    pub fn load(dir: &Path, options: SegmentOptions) -> Result<Self, CorpusError> {
        if !dir.is_dir() {
            return Err(CorpusError::DirectoryNotFound {
                path: dir.display().to_string(),
            });
        }
        let entries = std::fs::read_dir(dir).map_err(|e| CorpusError::ReadFailed {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            let text = std::fs::read_to_string(path).map_err(|e| CorpusError::ReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            documents.push((stem, text));
        }

        let corpus = Self::from_documents(documents, options);
        if corpus.is_empty() {
            return Err(CorpusError::Empty {
                path: dir.display().to_string(),
            });
        }
        info!(
            documents = paths.len(),
            fragments = corpus.len(),
            dir = %dir.display(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// Build from `(document id, text)` pairs, in the given order.
    pub fn from_documents<I, S, T>(documents: I, options: SegmentOptions) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut fragments = Vec::new();
        for (doc, text) in documents {
            let doc_fragments = segment(doc.as_ref(), text.as_ref(), options);
            debug!(document = doc.as_ref(), fragments = doc_fragments.len(), "segmented");
            fragments.extend(doc_fragments);
        }
        Self { fragments }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn get(&self, position: usize) -> Option<&Fragment> {
        self.fragments.get(position)
    }

    pub fn find(&self, id: &str) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.id() == id)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_load_in_sorted_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_calendar.md"),
            "## Winter Classics 1997\n- Dates: 1997-12-01 to 1997-12-31\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_policy.md"),
            "# Returns\n- Beverages unopened: 14 days; opened: no returns.\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored because it is not markdown").unwrap();

        let corpus = Corpus::load(dir.path(), SegmentOptions::default()).unwrap();
        let ids: Vec<String> = corpus.fragments().iter().map(Fragment::id).collect();
        assert_eq!(ids, ["a_policy::chunk0", "b_calendar::chunk0"]);
        assert!(corpus.find("b_calendar::chunk0").is_some());
    }

    #[test]
    fn missing_or_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Corpus::load(dir.path(), SegmentOptions::default()),
            Err(CorpusError::Empty { .. })
        ));
        assert!(matches!(
            Corpus::load(&dir.path().join("absent"), SegmentOptions::default()),
            Err(CorpusError::DirectoryNotFound { .. })
        ));
    }
}
