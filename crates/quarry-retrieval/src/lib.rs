//! # quarry-retrieval
//!
//! Document corpus and Text Ranker.
//!
//! Markdown documents are segmented into paragraph-level fragments once at
//! startup. Questions are scored against every fragment with Okapi BM25;
//! the top-K fragments above the relevance threshold are returned in
//! non-increasing score order, ties kept in corpus order.

pub mod bm25;
pub mod corpus;
pub mod ranker;
pub mod segment;
pub mod tokenizer;

pub use bm25::{Bm25Index, Bm25Params};
pub use corpus::Corpus;
pub use ranker::{RankerOptions, TextRanker};
pub use segment::SegmentOptions;
