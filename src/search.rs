//! Search results and the progressive cursor.

pub mod cursor;

use serde::{Deserialize, Serialize};

use crate::index::document::DocId;

/// A matched document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// The document URI.
    pub uri: String,
    /// The relevance score.
    pub score: f32,
    /// Internal id of the matched document version.
    pub doc_id: DocId,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hits in rank order.
    pub hits: Vec<SearchHit>,
    /// True if another call may produce more hits.
    pub more_available: bool,
}

impl SearchResults {
    /// An empty page with no continuation.
    pub fn finished() -> Self {
        SearchResults::default()
    }

    /// An empty page that asks the caller to call again.
    pub fn pending() -> Self {
        SearchResults {
            hits: Vec::new(),
            more_available: true,
        }
    }

    /// Number of hits in this page.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Check if the page has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// URIs of the hits, in rank order.
    pub fn uris(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.uri.as_str()).collect()
    }
}
