//! Index configuration.
//!
//! An [`IndexConfig`] is fixed when an index is created and persisted with
//! it. Every analysis decision (tokenizer character classes, stop words,
//! minimum term length) is derived from it, so reopening an index always
//! normalizes text the way it did when the index was built.
//!
//! # Examples
//!
//! ```
//! use quire::index::config::{IndexConfig, IndexVariant};
//!
//! let config = IndexConfig::default()
//!     .with_proximity_indexing(true)
//!     .with_stop_words(["The", "a"])
//!     .with_min_term_length(2);
//!
//! assert_eq!(config.variant, IndexVariant::Inverted);
//! assert!(config.stop_words.contains("the"));
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::min_length::MinLengthFilter;
use crate::analysis::token_filter::stop::{DEFAULT_ENGLISH_STOP_WORDS, StopFilter};
use crate::analysis::tokenizer::char_class::CharClassTokenizer;
use crate::error::{QuireError, Result};

/// Kind of index structure maintained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexVariant {
    /// Term to posting list index, used for text queries.
    #[default]
    Inverted,
    /// Document term vectors only, used for similarity queries.
    Vector,
    /// Both of the above.
    InvertedAndVector,
}

impl IndexVariant {
    /// Whether text queries are answered by this variant.
    pub fn supports_text_search(self) -> bool {
        matches!(self, IndexVariant::Inverted | IndexVariant::InvertedAndVector)
    }

    /// Whether similarity queries are answered by this variant.
    pub fn supports_similarity(self) -> bool {
        matches!(self, IndexVariant::Vector | IndexVariant::InvertedAndVector)
    }
}

/// Immutable configuration of one index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index structure.
    pub variant: IndexVariant,

    /// Store term positions so proximity and phrase constraints can be checked.
    pub proximity_indexing: bool,

    /// Terms never indexed nor matched. Stored lower-cased.
    pub stop_words: BTreeSet<String>,

    /// Shortest term, in characters, that is indexed.
    pub min_term_length: usize,

    /// Largest position span a proximity match may cover.
    pub proximity_window: u32,

    /// Cap on distinct terms recorded per document.
    pub max_terms_per_document: Option<usize>,

    /// Extra characters that may begin a term.
    pub start_term_chars: String,

    /// Extra characters allowed inside a term.
    pub term_chars: String,

    /// Extra characters allowed to end a term.
    pub end_term_chars: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            variant: IndexVariant::Inverted,
            proximity_indexing: false,
            stop_words: BTreeSet::new(),
            min_term_length: 1,
            proximity_window: 10,
            max_terms_per_document: None,
            start_term_chars: String::new(),
            term_chars: String::new(),
            end_term_chars: String::new(),
        }
    }
}

impl IndexConfig {
    /// Set the index variant.
    pub fn with_variant(mut self, variant: IndexVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Enable or disable position indexing.
    pub fn with_proximity_indexing(mut self, enabled: bool) -> Self {
        self.proximity_indexing = enabled;
        self
    }

    /// Replace the stop word set.
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    /// Add the built-in English stop words to the set.
    pub fn with_english_stop_words(mut self) -> Self {
        self.stop_words
            .extend(DEFAULT_ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()));
        self
    }

    /// Set the minimum term length.
    pub fn with_min_term_length(mut self, min_term_length: usize) -> Self {
        self.min_term_length = min_term_length;
        self
    }

    /// Set the proximity window.
    pub fn with_proximity_window(mut self, window: u32) -> Self {
        self.proximity_window = window;
        self
    }

    /// Cap the number of distinct terms per document.
    pub fn with_max_terms_per_document(mut self, max_terms: usize) -> Self {
        self.max_terms_per_document = Some(max_terms);
        self
    }

    /// Set the extra tokenizer character classes.
    pub fn with_term_chars(mut self, start: &str, inner: &str, end: &str) -> Self {
        self.start_term_chars = start.to_string();
        self.term_chars = inner.to_string();
        self.end_term_chars = end.to_string();
        self
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: IndexConfig = serde_json::from_str(&content)?;
        config.validated()
    }

    /// Check the configuration and normalize stop word case.
    pub fn validated(mut self) -> Result<Self> {
        if self.min_term_length == 0 {
            self.min_term_length = 1;
        }
        if self.proximity_window == 0 {
            return Err(QuireError::invalid_argument(
                "proximity_window must be at least 1",
            ));
        }
        if self.max_terms_per_document == Some(0) {
            return Err(QuireError::invalid_argument(
                "max_terms_per_document must be at least 1",
            ));
        }
        self.stop_words = self
            .stop_words
            .iter()
            .map(|w| w.to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Ok(self)
    }

    fn tokenizer(&self) -> CharClassTokenizer {
        CharClassTokenizer::with_chars(
            &self.start_term_chars,
            &self.term_chars,
            &self.end_term_chars,
        )
    }

    /// Analyzer used for document text and query words.
    pub fn analyzer(&self) -> PipelineAnalyzer {
        let mut analyzer = PipelineAnalyzer::new(Arc::new(self.tokenizer()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(MinLengthFilter::new(self.min_term_length)));
        if !self.stop_words.is_empty() {
            analyzer = analyzer.add_filter(Arc::new(StopFilter::from_words(&self.stop_words)));
        }
        analyzer
    }

    /// Analyzer used for the stem of a prefix query word.
    ///
    /// Prefixes are matched against indexed terms only, so they skip the
    /// length and stop word filters.
    pub fn prefix_analyzer(&self) -> PipelineAnalyzer {
        PipelineAnalyzer::new(Arc::new(self.tokenizer()))
            .add_filter(Arc::new(LowercaseFilter::new()))
    }
}
