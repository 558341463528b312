//! The index handle.
//!
//! [`Index`] ties the document store, the inverted index and the codec into
//! one object. It is a cheap clone over shared state: mutations are
//! serialized by a writer lock that also guards the pending-add buffer,
//! while committed state sits behind a read-write lock so searches and
//! introspection run concurrently and only ever see flushed documents.
//!
//! An index lives either in memory or in a file. A file index is read fully
//! on open and written back atomically on [`Index::save`] and, when
//! writable, on [`Index::close`].
//!
//! # Examples
//!
//! ```
//! use quire::engine::Index;
//! use quire::index::config::IndexConfig;
//!
//! let index = Index::create(IndexConfig::default().with_stop_words(["the"])).unwrap();
//! index.add_text("doc://1", "the cat", false).unwrap();
//! index.add_text("doc://2", "the dog and the cat", false).unwrap();
//! index.flush().unwrap();
//!
//! let results = index.search("cat", 10, None).unwrap();
//! assert_eq!(results.hits.len(), 2);
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::error::{QuireError, Result};
use crate::extract;
use crate::index::config::IndexConfig;
use crate::index::document::{AnalyzedDocument, DocumentState, DocumentStore, TermCount, TermState};
use crate::index::inverted::InvertedIndex;
use crate::index::property::PropertyMap;
use crate::query::collector::{ScoredDoc, TopDocsCollector};
use crate::query::matcher::{QueryPlan, Scan, ScanStatus, SearchContext};
use crate::query::parser::{ParsedQuery, QueryParser};
use crate::query::scoring::{cosine, idf, tf_weight};
use crate::search::SearchResults;
use crate::search::cursor::{ProgressiveSearch, to_hits};
use crate::storage::{codec, file};

/// What [`Index::add_text`] did with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddOutcome {
    /// New URI, queued for the next flush.
    Added,
    /// Existing URI, new text queued to displace the old one.
    Replaced,
    /// Existing URI and replacement not allowed; nothing changed.
    Skipped,
}

/// Space reclaimed by [`Index::compact`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactStats {
    /// Tombstoned document records dropped.
    pub documents: usize,
    /// Postings dropped.
    pub postings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Backing {
    Memory,
    File { path: PathBuf, writable: bool },
}

#[derive(Debug, Default)]
struct IndexState {
    store: DocumentStore,
    inverted: InvertedIndex,
}

#[derive(Debug)]
struct IndexInner {
    config: Arc<IndexConfig>,
    analyzer: PipelineAnalyzer,
    backing: Backing,
    closed: AtomicBool,
    /// Writer lock; holds adds waiting for the next flush.
    pending: Mutex<Vec<AnalyzedDocument>>,
    state: RwLock<IndexState>,
}

/// A full-text index.
#[derive(Debug, Clone)]
pub struct Index {
    inner: Arc<IndexInner>,
}

impl Index {
    fn with_state(config: IndexConfig, state: IndexState, backing: Backing) -> Self {
        let analyzer = config.analyzer();
        Index {
            inner: Arc::new(IndexInner {
                config: Arc::new(config),
                analyzer,
                backing,
                closed: AtomicBool::new(false),
                pending: Mutex::new(Vec::new()),
                state: RwLock::new(state),
            }),
        }
    }

    fn empty_state(config: &IndexConfig) -> IndexState {
        IndexState {
            store: DocumentStore::new(),
            inverted: InvertedIndex::new(config.proximity_indexing),
        }
    }

    /// Create an empty in-memory index.
    pub fn create(config: IndexConfig) -> Result<Self> {
        let config = config.validated()?;
        let state = Self::empty_state(&config);
        log::info!("created memory index ({:?})", config.variant);
        Ok(Self::with_state(config, state, Backing::Memory))
    }

    /// Rebuild an in-memory index from serialized bytes.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let image = codec::decode_index(bytes).inspect_err(|e| {
            log::warn!("rejected index bytes: {e}");
        })?;
        log::info!(
            "loaded memory index with {} documents",
            image.store.live_count()
        );
        Ok(Self::from_image(image, Backing::Memory))
    }

    fn from_image(image: codec::IndexImage, backing: Backing) -> Self {
        let state = IndexState {
            store: image.store,
            inverted: image.inverted,
        };
        Self::with_state(image.config, state, backing)
    }

    /// Create a file index at `path` and write the empty index immediately.
    ///
    /// Fails with [`QuireError::AlreadyExists`] if the path is taken.
    pub fn create_file<P: AsRef<Path>>(path: P, config: IndexConfig) -> Result<Self> {
        let path = path.as_ref();
        let config = config.validated()?;
        let state = Self::empty_state(&config);
        let bytes = codec::encode_index(&config, &state.store, &state.inverted)?;
        file::create_new(path, &bytes)?;
        log::info!("created index file {}", path.display());
        Ok(Self::with_state(
            config,
            state,
            Backing::File {
                path: path.to_path_buf(),
                writable: true,
            },
        ))
    }

    /// Open an existing index file.
    ///
    /// A read-only index rejects every mutation and never writes the file.
    pub fn open_file<P: AsRef<Path>>(path: P, writable: bool) -> Result<Self> {
        let path = path.as_ref();
        let bytes = file::read(path)?;
        let image = codec::decode_index(&bytes).inspect_err(|e| {
            log::warn!("rejected index file {}: {e}", path.display());
        })?;
        log::info!(
            "opened index file {} ({} documents, {})",
            path.display(),
            image.store.live_count(),
            if writable { "read-write" } else { "read-only" }
        );
        Ok(Self::from_image(
            image,
            Backing::File {
                path: path.to_path_buf(),
                writable,
            },
        ))
    }

    /// The configuration the index was created with.
    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    /// Path of a file index.
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.backing {
            Backing::File { path, .. } => Some(path),
            Backing::Memory => None,
        }
    }

    /// Check if mutations are allowed.
    pub fn is_writable(&self) -> bool {
        !matches!(self.inner.backing, Backing::File { writable: false, .. })
    }

    /// Check if the index has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(QuireError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> Result<()> {
        self.check_open()?;
        if self.is_writable() {
            Ok(())
        } else {
            Err(QuireError::ReadOnly)
        }
    }

    /// Take the writer lock of a writable, open index.
    fn lock_writer(&self) -> Result<MutexGuard<'_, Vec<AnalyzedDocument>>> {
        self.check_writable()?;
        let guard = self.inner.pending.lock();
        self.check_open()?;
        Ok(guard)
    }

    /// Take the writer lock of an open index, writable or not.
    fn lock_open(&self) -> Result<MutexGuard<'_, Vec<AnalyzedDocument>>> {
        self.check_open()?;
        let guard = self.inner.pending.lock();
        self.check_open()?;
        Ok(guard)
    }

    /// Run `f` against committed state, or return `None` if closed.
    pub(crate) fn read_committed<R>(&self, f: impl FnOnce(&SearchContext<'_>) -> R) -> Option<R> {
        if self.is_closed() {
            return None;
        }
        let state = self.inner.state.read();
        let ctx = SearchContext {
            store: &state.store,
            inverted: &state.inverted,
            proximity_window: self
                .inner
                .config
                .proximity_indexing
                .then_some(self.inner.config.proximity_window),
        };
        Some(f(&ctx))
    }

    fn read_state<R>(&self, f: impl FnOnce(&IndexState) -> R) -> Result<R> {
        self.check_open()?;
        Ok(f(&self.inner.state.read()))
    }

    /// Queue a document for indexing at the next flush.
    ///
    /// If the URI is already known and `can_replace` is false the call does
    /// nothing and reports [`AddOutcome::Skipped`].
    pub fn add_text(&self, uri: &str, text: &str, can_replace: bool) -> Result<AddOutcome> {
        self.check_writable()?;
        let document = AnalyzedDocument::analyze(
            uri,
            text,
            &self.inner.analyzer,
            self.inner.config.max_terms_per_document,
        )?;

        let mut pending = self.lock_writer()?;
        let queued = pending.iter().any(|d| d.uri == uri);
        let exists = queued || self.inner.state.read().store.live_id(uri).is_some();
        if exists && !can_replace {
            return Ok(AddOutcome::Skipped);
        }
        if queued {
            pending.retain(|d| d.uri != uri);
        }
        pending.push(document);

        Ok(if exists {
            AddOutcome::Replaced
        } else {
            AddOutcome::Added
        })
    }

    /// Extract a file's text and queue it under its `file://` URL.
    pub fn add_file<P: AsRef<Path>>(
        &self,
        path: P,
        mime: Option<&str>,
        can_replace: bool,
    ) -> Result<AddOutcome> {
        let path = path.as_ref();
        self.check_writable()?;
        let text = extract::extract_text(path, mime)?;
        let uri = extract::file_uri(path)?;
        self.add_text(&uri, &text, can_replace)
    }

    /// Queue every extractable file under `path`, recursively.
    ///
    /// Returns the URIs that were added or replaced. A path that is not a
    /// directory yields an empty list.
    pub fn add_folder<P: AsRef<Path>>(&self, path: P, can_replace: bool) -> Result<Vec<String>> {
        self.check_writable()?;
        let files = extract::extract_folder(path.as_ref());
        let mut added = Vec::with_capacity(files.len());
        for extracted in files {
            if self.add_text(&extracted.uri, &extracted.text, can_replace)? != AddOutcome::Skipped {
                added.push(extracted.uri);
            }
        }
        Ok(added)
    }

    /// Remove a document. It disappears from search immediately.
    ///
    /// Returns false if the URI was neither committed nor pending.
    pub fn remove(&self, uri: &str) -> Result<bool> {
        let mut pending = self.lock_writer()?;
        let before = pending.len();
        pending.retain(|d| d.uri != uri);
        let dropped_pending = pending.len() != before;
        let tombstoned = self.inner.state.write().store.tombstone(uri).is_some();
        Ok(dropped_pending || tombstoned)
    }

    /// Commit pending adds and return how many were committed.
    pub fn flush(&self) -> Result<usize> {
        let mut pending = self.lock_open()?;
        Ok(self.flush_locked(&mut pending))
    }

    fn flush_locked(&self, pending: &mut Vec<AnalyzedDocument>) -> usize {
        if pending.is_empty() {
            return 0;
        }
        let mut state = self.inner.state.write();
        let state = &mut *state;
        let count = pending.len();
        for document in pending.drain(..) {
            let id = state.store.commit(&document);
            state.inverted.add_document(id, &document);
        }
        log::debug!(
            "flushed {count} documents ({} live, {} terms)",
            state.store.live_count(),
            state.inverted.term_count()
        );
        count
    }

    /// Drop removed documents and their postings.
    pub fn compact(&self) -> Result<CompactStats> {
        let _writer = self.lock_open()?;
        Ok(self.compact_locked())
    }

    fn compact_locked(&self) -> CompactStats {
        let mut state = self.inner.state.write();
        let dead: AHashSet<_> = state.store.compact().into_iter().collect();
        let postings = state.inverted.remove_documents(&dead);
        let stats = CompactStats {
            documents: dead.len(),
            postings,
        };
        if stats.documents > 0 {
            log::debug!(
                "compacted {} documents and {} postings",
                stats.documents,
                stats.postings
            );
        }
        stats
    }

    /// Replace the property map of an indexed document.
    pub fn set_properties(&self, uri: &str, properties: PropertyMap) -> Result<()> {
        let _writer = self.lock_writer()?;
        if self.inner.state.write().store.set_properties(uri, properties) {
            Ok(())
        } else {
            Err(QuireError::not_indexed_yet(uri))
        }
    }

    /// Properties of an indexed document; empty if it is not indexed.
    pub fn properties(&self, uri: &str) -> Result<PropertyMap> {
        self.read_state(|state| {
            state
                .store
                .get_by_uri(uri)
                .map(|record| record.properties.clone())
                .unwrap_or_default()
        })
    }

    /// Indexing state of a URI.
    pub fn document_state(&self, uri: &str) -> Result<DocumentState> {
        self.read_state(|state| match state.store.live_id(uri) {
            Some(_) => DocumentState::Indexed,
            None => DocumentState::NotIndexed,
        })
    }

    /// Check if a URI is committed and live.
    pub fn is_indexed(&self, uri: &str) -> Result<bool> {
        Ok(self.document_state(uri)? == DocumentState::Indexed)
    }

    /// URIs of indexed documents, filtered by whether they have terms.
    pub fn documents(&self, state: TermState) -> Result<Vec<String>> {
        self.read_state(|s| s.store.uris_by_term_state(state))
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> Result<usize> {
        self.read_state(|state| state.store.live_count())
    }

    /// Distinct terms of an indexed document; 0 if not indexed.
    pub fn term_count(&self, uri: &str) -> Result<usize> {
        self.read_state(|state| {
            state
                .store
                .get_by_uri(uri)
                .map_or(0, |record| record.term_count())
        })
    }

    /// Check if a document has no terms.
    pub fn is_empty(&self, uri: &str) -> Result<bool> {
        Ok(self.term_count(uri)? == 0)
    }

    /// Terms of an indexed document with their frequencies.
    pub fn terms(&self, uri: &str) -> Result<Vec<TermCount>> {
        self.read_state(|state| {
            state
                .store
                .get_by_uri(uri)
                .map(|record| record.term_counts())
                .unwrap_or_default()
        })
    }

    /// Remove every indexed document that has no terms.
    ///
    /// `progress` is called with `(total, done)` after each removal.
    pub fn prune(&self, progress: Option<&dyn Fn(usize, usize)>) -> Result<usize> {
        let _writer = self.lock_writer()?;
        let empty = self
            .inner
            .state
            .read()
            .store
            .uris_by_term_state(TermState::Empty);
        let total = empty.len();
        for (done, uri) in empty.iter().enumerate() {
            self.inner.state.write().store.tombstone(uri);
            if let Some(progress) = progress {
                progress(total, done + 1);
            }
        }
        log::debug!("pruned {total} empty documents");
        Ok(total)
    }

    fn parse(&self, query: &str) -> Result<ParsedQuery> {
        if !self.inner.config.variant.supports_text_search() {
            return Err(QuireError::unsupported(format!(
                "{:?} index does not support text search",
                self.inner.config.variant
            )));
        }
        QueryParser::new(&self.inner.config).parse(query)
    }

    /// Search committed documents.
    ///
    /// Returns at most `limit` hits, best first. When `timeout` runs out
    /// before every candidate is scored, the hits found so far are ranked
    /// and returned with `more_available` set. A closed index returns no
    /// hits.
    pub fn search(&self, query: &str, limit: usize, timeout: Option<Duration>) -> Result<SearchResults> {
        let parsed = self.parse(query)?;
        if parsed.matches_nothing() {
            return Ok(SearchResults::finished());
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        let limit = limit.max(1);

        let results = self.read_committed(|ctx| {
            let plan = QueryPlan::build(&parsed, ctx);
            let mut scan = Scan::new(&plan);
            let status = scan.run(&plan, ctx, deadline, &AtomicBool::new(false));

            let mut collector = TopDocsCollector::new(limit);
            for hit in scan.hits() {
                collector.collect(*hit);
            }
            let more_available = status == ScanStatus::TimedOut || collector.total_hits() > limit;
            SearchResults {
                hits: to_hits(&collector.into_sorted_vec(), ctx),
                more_available,
            }
        });
        Ok(results.unwrap_or_default())
    }

    /// Start a progressive search.
    pub fn progressive_search(&self, query: &str) -> Result<ProgressiveSearch> {
        let parsed = self.parse(query)?;
        Ok(ProgressiveSearch::new(self.clone(), query, parsed))
    }

    /// Documents most similar to `text` by cosine of TF-IDF vectors.
    ///
    /// Requires a variant with vector support.
    pub fn find_similar(&self, text: &str, limit: usize) -> Result<SearchResults> {
        if !self.inner.config.variant.supports_similarity() {
            return Err(QuireError::unsupported(format!(
                "{:?} index does not support similarity search",
                self.inner.config.variant
            )));
        }
        let probe = AnalyzedDocument::analyze("", text, &self.inner.analyzer, None)?;
        let limit = limit.max(1);

        let results = self.read_committed(|ctx| {
            let mut idf_cache: AHashMap<String, f32> = AHashMap::new();
            let query_vector = tfidf_vector(
                probe
                    .terms
                    .iter()
                    .map(|(term, positions)| (term.as_str(), positions.len() as u32)),
                ctx,
                &mut idf_cache,
            );

            let mut collector = TopDocsCollector::new(limit);
            for record in ctx.store.live_records() {
                let doc_vector = tfidf_vector(
                    record.terms.iter().map(|(term, &count)| (term.as_str(), count)),
                    ctx,
                    &mut idf_cache,
                );
                let score = cosine(&query_vector, &doc_vector);
                if score > 0.0 {
                    collector.collect(ScoredDoc {
                        doc_id: record.id,
                        score,
                    });
                }
            }
            let more_available = collector.total_hits() > limit;
            SearchResults {
                hits: to_hits(&collector.into_sorted_vec(), ctx),
                more_available,
            }
        });
        Ok(results.unwrap_or_default())
    }

    /// Serialize the index. Pending adds are flushed and removed documents
    /// compacted first.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut pending = self.lock_open()?;
        self.encode_locked(&mut pending)
    }

    fn encode_locked(&self, pending: &mut Vec<AnalyzedDocument>) -> Result<Vec<u8>> {
        self.flush_locked(pending);
        self.compact_locked();
        let state = self.inner.state.read();
        codec::encode_index(&self.inner.config, &state.store, &state.inverted)
    }

    /// Write a file index back to disk atomically.
    pub fn save(&self) -> Result<()> {
        let mut pending = self.lock_writer()?;
        self.save_locked(&mut pending)
    }

    fn save_locked(&self, pending: &mut Vec<AnalyzedDocument>) -> Result<()> {
        let Backing::File { path, .. } = &self.inner.backing else {
            return Err(QuireError::unsupported("a memory index has no file to save to"));
        };
        let bytes = self.encode_locked(pending)?;
        file::write_atomic(path, &bytes)?;
        log::info!("saved index file {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Close the index. A writable file index is saved first.
    ///
    /// Afterwards mutations and introspection fail with
    /// [`QuireError::Closed`] and searches return no hits. Closing twice is
    /// a no-op.
    pub fn close(&self) -> Result<()> {
        let mut pending = self.inner.pending.lock();
        if self.is_closed() {
            return Ok(());
        }
        if let Backing::File { writable: true, .. } = self.inner.backing {
            self.save_locked(&mut pending)?;
        }
        pending.clear();
        self.inner.closed.store(true, Ordering::Release);
        match self.path() {
            Some(path) => log::info!("closed index file {}", path.display()),
            None => log::info!("closed memory index"),
        }
        Ok(())
    }
}

/// TF-IDF weights of a term vector given in term order.
fn tfidf_vector<'t>(
    terms: impl Iterator<Item = (&'t str, u32)>,
    ctx: &SearchContext<'_>,
    idf_cache: &mut AHashMap<String, f32>,
) -> Vec<(&'t str, f32)> {
    terms
        .map(|(term, frequency)| {
            let term_idf = match idf_cache.get(term) {
                Some(&cached) => cached,
                None => {
                    let df = ctx.inverted.postings(term).map_or(0, |list| {
                        list.iter().filter(|p| ctx.store.is_live(p.doc_id)).count()
                    });
                    let value = idf(ctx.store.live_count(), df);
                    idf_cache.insert(term.to_string(), value);
                    value
                }
            };
            (term, tf_weight(frequency) * term_idf)
        })
        .collect()
}
