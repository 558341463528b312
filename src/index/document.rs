//! Document store.
//!
//! Maps document URIs to committed [`DocumentRecord`]s. Every committed
//! version of a document gets a fresh [`DocId`]; ids grow monotonically and
//! are never reused, so posting lists stay sorted by id and a replaced
//! document's old postings can be told apart from the new ones.
//!
//! Removal is logical: the record's id is set in a deletion bitmap and the
//! URI stops resolving. The record and its postings are reclaimed by
//! [`DocumentStore::compact`].

use std::collections::BTreeMap;

use ahash::AHashMap;
use bit_vec::BitVec;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::error::Result;
use crate::index::property::PropertyMap;

/// Internal document identifier.
pub type DocId = u64;

/// Largest `next_doc_id` a loaded index may carry.
pub const MAX_DOC_ID: DocId = u32::MAX as DocId;

/// Indexing state of a document URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Unknown, removed, or added but not flushed yet.
    NotIndexed,
    /// Committed by a flush and visible to search.
    Indexed,
}

/// Selector for [`DocumentStore::uris_by_term_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermState {
    #[default]
    All,
    Empty,
    NotEmpty,
}

/// A term and its frequency in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub term: String,
    pub count: u32,
}

/// Analysis output for one document, waiting for the next flush.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedDocument {
    pub uri: String,
    /// Term to ascending token positions.
    pub terms: BTreeMap<String, Vec<u32>>,
    /// Tokens kept by the analyzer.
    pub token_count: u32,
}

impl AnalyzedDocument {
    /// Analyze `text` into a pending document.
    ///
    /// With `max_terms` set, tokens introducing a term beyond the cap are
    /// dropped; further occurrences of already recorded terms still count.
    pub fn analyze(
        uri: &str,
        text: &str,
        analyzer: &dyn Analyzer,
        max_terms: Option<usize>,
    ) -> Result<Self> {
        let mut terms: BTreeMap<String, Vec<u32>> = BTreeMap::new();
        let mut token_count = 0u32;

        for token in analyzer.analyze(text)? {
            let position = u32::try_from(token.position).unwrap_or(u32::MAX);
            match terms.get_mut(&token.text) {
                Some(positions) => positions.push(position),
                None => {
                    if max_terms.is_some_and(|max| terms.len() >= max) {
                        continue;
                    }
                    terms.insert(token.text, vec![position]);
                }
            }
            token_count = token_count.saturating_add(1);
        }

        Ok(AnalyzedDocument {
            uri: uri.to_string(),
            terms,
            token_count,
        })
    }
}

/// A committed document version.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: DocId,
    pub uri: String,
    /// Term to frequency.
    pub terms: BTreeMap<String, u32>,
    pub token_count: u32,
    pub properties: PropertyMap,
}

impl DocumentRecord {
    /// Distinct terms in this document.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Terms with their frequencies, in term order.
    pub fn term_counts(&self) -> Vec<TermCount> {
        self.terms
            .iter()
            .map(|(term, &count)| TermCount {
                term: term.clone(),
                count,
            })
            .collect()
    }
}

/// Committed documents keyed by id, with a URI lookup for live ones.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    records: BTreeMap<DocId, DocumentRecord>,
    live: AHashMap<String, DocId>,
    /// Bit set = deleted.
    deleted: BitVec,
    next_doc_id: DocId,
}

impl DocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from loaded records.
    ///
    /// Every id without a record is treated as deleted. The bitmap covers
    /// only the ids present; ids past its end read as deleted.
    pub(crate) fn from_records(records: Vec<DocumentRecord>, next_doc_id: DocId) -> Self {
        let len = records
            .iter()
            .map(|r| r.id as usize + 1)
            .max()
            .unwrap_or(0);
        let mut deleted = BitVec::from_elem(len, true);
        let mut store = DocumentStore {
            records: BTreeMap::new(),
            live: AHashMap::with_capacity(records.len()),
            deleted: BitVec::new(),
            next_doc_id,
        };
        for record in records {
            deleted.set(record.id as usize, false);
            store.live.insert(record.uri.clone(), record.id);
            store.records.insert(record.id, record);
        }
        store.deleted = deleted;
        store
    }

    /// Id of the live document with this URI.
    pub fn live_id(&self, uri: &str) -> Option<DocId> {
        self.live.get(uri).copied()
    }

    /// Live record for a URI.
    pub fn get_by_uri(&self, uri: &str) -> Option<&DocumentRecord> {
        self.live_id(uri).and_then(|id| self.records.get(&id))
    }

    /// Record for an id, live or not.
    pub fn get(&self, id: DocId) -> Option<&DocumentRecord> {
        self.records.get(&id)
    }

    /// Check if an id refers to a live document.
    pub fn is_live(&self, id: DocId) -> bool {
        !self.deleted.get(id as usize).unwrap_or(true)
    }

    /// Number of live documents.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of stored records, including tombstoned ones awaiting compaction.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Next id to be assigned.
    pub fn next_doc_id(&self) -> DocId {
        self.next_doc_id
    }

    /// Live records in id order.
    pub fn live_records(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records.values().filter(|r| self.is_live(r.id))
    }

    /// Commit an analyzed document and return its new id.
    ///
    /// A live document with the same URI is tombstoned and its properties
    /// move to the new version.
    pub fn commit(&mut self, document: &AnalyzedDocument) -> DocId {
        let id = self.next_doc_id;
        self.next_doc_id += 1;
        let slot = id as usize;
        if self.deleted.len() <= slot {
            let grow = slot + 1 - self.deleted.len();
            self.deleted.grow(grow, true);
        }
        self.deleted.set(slot, false);

        let properties = match self.tombstone(&document.uri) {
            Some(old_id) => self
                .records
                .get_mut(&old_id)
                .map(|old| std::mem::take(&mut old.properties))
                .unwrap_or_default(),
            None => PropertyMap::new(),
        };

        let record = DocumentRecord {
            id,
            uri: document.uri.clone(),
            terms: document
                .terms
                .iter()
                .map(|(term, positions)| (term.clone(), positions.len() as u32))
                .collect(),
            token_count: document.token_count,
            properties,
        };
        self.live.insert(record.uri.clone(), id);
        self.records.insert(id, record);
        id
    }

    /// Tombstone the live document with this URI and return its id.
    pub fn tombstone(&mut self, uri: &str) -> Option<DocId> {
        let id = self.live.remove(uri)?;
        self.deleted.set(id as usize, true);
        Some(id)
    }

    /// Replace the properties of a live document.
    ///
    /// Returns false when no live document has this URI.
    pub fn set_properties(&mut self, uri: &str, properties: PropertyMap) -> bool {
        match self.live_id(uri).and_then(|id| self.records.get_mut(&id)) {
            Some(record) => {
                record.properties = properties;
                true
            }
            None => false,
        }
    }

    /// Live URIs filtered by whether the document has terms.
    pub fn uris_by_term_state(&self, state: TermState) -> Vec<String> {
        self.live_records()
            .filter(|r| match state {
                TermState::All => true,
                TermState::Empty => r.terms.is_empty(),
                TermState::NotEmpty => !r.terms.is_empty(),
            })
            .map(|r| r.uri.clone())
            .collect()
    }

    /// Drop tombstoned records and return their ids.
    pub fn compact(&mut self) -> Vec<DocId> {
        let dead: Vec<DocId> = self
            .records
            .keys()
            .copied()
            .filter(|&id| !self.is_live(id))
            .collect();
        for id in &dead {
            self.records.remove(id);
        }
        dead
    }
}
