//! # Quire
//!
//! An embeddable full-text index.
//!
//! ## Features
//!
//! - In-memory and file-backed indexes with atomic saves
//! - Configurable analysis: stop words, minimum term length, term characters
//! - Boolean, prefix, phrase and proximity queries with TF-IDF ranking
//! - Progressive search that pages through results under a time budget
//! - Per-document properties
//! - A worker-pool task layer for batched indexing and searching
//! - Extractive text summarization

pub mod analysis;
pub mod cli;
pub mod engine;
pub mod error;
pub mod extract;
pub mod index;
pub mod query;
pub mod search;
pub mod storage;
pub mod summary;
pub mod task;
pub mod util;

pub mod prelude {
    pub use crate::engine::{AddOutcome, CompactStats, Index};
    pub use crate::error::{QuireError, Result};
    pub use crate::index::config::{IndexConfig, IndexVariant};
    pub use crate::index::document::{DocumentState, TermCount, TermState};
    pub use crate::index::property::{PropertyMap, PropertyValue};
    pub use crate::search::cursor::{CursorState, ProgressiveSearch};
    pub use crate::search::{SearchHit, SearchResults};
    pub use crate::summary::Summarizer;
    pub use crate::task::search_task::SearchTask;
    pub use crate::task::{BatchOptions, TaskController, TextTask};
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
