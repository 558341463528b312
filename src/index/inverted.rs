//! Committed inverted index.
//!
//! Terms live in a `BTreeMap` so a prefix query is a range scan over the
//! dictionary. Documents are appended at flush time only; the pending side of
//! the commit barrier is held by the index engine.

use std::collections::BTreeMap;
use std::ops::Bound;

use ahash::AHashSet;

use crate::index::document::{AnalyzedDocument, DocId};
use crate::index::posting::{Posting, PostingList};

/// Term dictionary mapping terms to posting lists.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    terms: BTreeMap<String, PostingList>,
    store_positions: bool,
}

impl InvertedIndex {
    /// Create an empty index.
    pub fn new(store_positions: bool) -> Self {
        InvertedIndex {
            terms: BTreeMap::new(),
            store_positions,
        }
    }

    /// Whether postings carry positions.
    pub fn stores_positions(&self) -> bool {
        self.store_positions
    }

    /// Append the postings of a newly committed document.
    pub fn add_document(&mut self, doc_id: DocId, document: &AnalyzedDocument) {
        for (term, positions) in &document.terms {
            let posting = if self.store_positions {
                Posting::with_positions(doc_id, positions.clone())
            } else {
                Posting::with_frequency(doc_id, positions.len() as u32)
            };
            self.terms
                .entry(term.clone())
                .or_insert_with(|| PostingList::new(term.clone()))
                .add_posting(posting);
        }
    }

    /// Insert a decoded posting list.
    pub(crate) fn insert_list(&mut self, list: PostingList) -> Option<PostingList> {
        self.terms.insert(list.term.clone(), list)
    }

    /// Posting list of an exact term.
    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.terms.get(term)
    }

    /// Posting lists of every term starting with `prefix`, in term order.
    pub fn prefix_postings<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a PostingList> + 'a {
        self.terms
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(term, _)| term.starts_with(prefix))
            .map(|(_, list)| list)
    }

    /// Drop postings of the given documents and any list left empty.
    ///
    /// Returns the number of postings removed.
    pub fn remove_documents(&mut self, doc_ids: &AHashSet<DocId>) -> usize {
        if doc_ids.is_empty() {
            return 0;
        }
        let mut removed = 0;
        self.terms.retain(|_, list| {
            removed += list.retain(|id| !doc_ids.contains(&id));
            !list.is_empty()
        });
        removed
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Total postings across all terms.
    pub fn posting_count(&self) -> usize {
        self.terms.values().map(PostingList::len).sum()
    }

    /// Iterate posting lists in term order.
    pub fn iter(&self) -> impl Iterator<Item = &PostingList> {
        self.terms.values()
    }
}
