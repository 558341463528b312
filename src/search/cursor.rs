//! Progressive search cursor.
//!
//! A cursor scores its candidates across as many calls as the caller's
//! timeouts require, ranks them once, and then serves the ranking page by
//! page. It can be cancelled from any thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::engine::Index;
use crate::query::collector::ScoredDoc;
use crate::query::matcher::{QueryPlan, Scan, ScanStatus, SearchContext};
use crate::query::parser::ParsedQuery;
use crate::search::{SearchHit, SearchResults};

/// Lifecycle of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No call made yet.
    Created,
    /// A call is running.
    Active,
    /// Between calls, with more results to come.
    Paused,
    /// Every result has been returned.
    Exhausted,
    /// Stopped by [`ProgressiveSearch::cancel`].
    Cancelled,
}

#[derive(Debug)]
enum Phase {
    Unplanned,
    Scanning { plan: QueryPlan, scan: Scan },
    Ranked { hits: Vec<ScoredDoc>, offset: usize },
    Done,
}

#[derive(Debug)]
struct CursorInner {
    state: CursorState,
    phase: Phase,
}

/// Resumable ranked iterator over the results of one query.
#[derive(Debug)]
pub struct ProgressiveSearch {
    index: Index,
    query: String,
    parsed: ParsedQuery,
    cancelled: Arc<AtomicBool>,
    inner: Mutex<CursorInner>,
}

impl ProgressiveSearch {
    pub(crate) fn new(index: Index, query: &str, parsed: ParsedQuery) -> Self {
        ProgressiveSearch {
            index,
            query: query.to_string(),
            parsed,
            cancelled: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(CursorInner {
                state: CursorState::Created,
                phase: Phase::Unplanned,
            }),
        }
    }

    /// The query text this cursor was created for.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        if self.cancelled.load(Ordering::Acquire) {
            return CursorState::Cancelled;
        }
        match self.inner.try_lock() {
            Some(inner) => inner.state,
            None => CursorState::Active,
        }
    }

    /// Stop the cursor. An in-flight [`next`](Self::next) returns early.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if the cursor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fetch the next page of up to `limit` hits.
    ///
    /// While candidates are still being scored, a call that runs past
    /// `timeout` returns an empty page with `more_available` set. Once
    /// `more_available` is false every later call returns an empty page.
    /// A `limit` of zero is treated as one.
    pub fn next(&self, limit: usize, timeout: Option<Duration>) -> SearchResults {
        let limit = limit.max(1);
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut inner = self.inner.lock();

        match inner.state {
            CursorState::Exhausted | CursorState::Cancelled => return SearchResults::finished(),
            _ if self.is_cancelled() => {
                inner.state = CursorState::Cancelled;
                inner.phase = Phase::Done;
                return SearchResults::finished();
            }
            _ => {}
        }
        inner.state = CursorState::Active;

        let inner = &mut *inner;
        let page = self.index.read_committed(|ctx| {
            self.advance(&mut inner.phase, ctx, limit, deadline)
        });

        let page = page.unwrap_or_else(|| {
            log::debug!("cursor for {:?} ended: index closed", self.query);
            inner.phase = Phase::Done;
            SearchResults::finished()
        });

        inner.state = if self.is_cancelled() && matches!(inner.phase, Phase::Done) {
            CursorState::Cancelled
        } else if page.more_available {
            CursorState::Paused
        } else {
            CursorState::Exhausted
        };
        page
    }

    fn advance(
        &self,
        phase: &mut Phase,
        ctx: &SearchContext<'_>,
        limit: usize,
        deadline: Option<Instant>,
    ) -> SearchResults {
        if let Phase::Unplanned = phase {
            if self.parsed.matches_nothing() {
                *phase = Phase::Done;
                return SearchResults::finished();
            }
            let plan = QueryPlan::build(&self.parsed, ctx);
            let scan = Scan::new(&plan);
            *phase = Phase::Scanning { plan, scan };
        }

        if let Phase::Scanning { plan, scan } = phase {
            match scan.run(plan, ctx, deadline, &self.cancelled) {
                ScanStatus::TimedOut => return SearchResults::pending(),
                ScanStatus::Cancelled => {
                    *phase = Phase::Done;
                    return SearchResults::finished();
                }
                ScanStatus::Complete => {}
            }
            if let Phase::Scanning { scan, .. } = std::mem::replace(phase, Phase::Done) {
                let mut hits = scan.into_hits();
                hits.sort_by(ScoredDoc::rank_cmp);
                *phase = Phase::Ranked { hits, offset: 0 };
            }
        }

        match phase {
            Phase::Ranked { hits, offset } => {
                let end = (*offset + limit).min(hits.len());
                let page = to_hits(&hits[*offset..end], ctx);
                *offset = end;
                let more_available = *offset < hits.len();
                if !more_available {
                    *phase = Phase::Done;
                }
                SearchResults {
                    hits: page,
                    more_available,
                }
            }
            _ => SearchResults::finished(),
        }
    }
}

/// Resolve scored ids to hits.
///
/// Documents removed or replaced after ranking are skipped, so a page can
/// come back shorter than its limit.
pub(crate) fn to_hits(docs: &[ScoredDoc], ctx: &SearchContext<'_>) -> Vec<SearchHit> {
    docs.iter()
        .filter(|doc| ctx.store.is_live(doc.doc_id))
        .filter_map(|doc| {
            ctx.store.get(doc.doc_id).map(|record| SearchHit {
                uri: record.uri.clone(),
                score: doc.score,
                doc_id: doc.doc_id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::config::IndexConfig;

    fn index_with(count: usize) -> Index {
        let index = Index::create(IndexConfig::default()).unwrap();
        for i in 0..count {
            index
                .add_text(&format!("doc://{i}"), "shared words here", false)
                .unwrap();
        }
        index.flush().unwrap();
        index
    }

    #[test]
    fn test_pages_until_exhausted() {
        let index = index_with(25);
        let cursor = index.progressive_search("shared").unwrap();
        assert_eq!(cursor.state(), CursorState::Created);

        let sizes: Vec<(usize, bool)> = (0..4)
            .map(|_| {
                let page = cursor.next(10, None);
                (page.len(), page.more_available)
            })
            .collect();
        assert_eq!(sizes, vec![(10, true), (10, true), (5, false), (0, false)]);
        assert_eq!(cursor.state(), CursorState::Exhausted);
    }

    #[test]
    fn test_pages_do_not_repeat() {
        let index = index_with(7);
        let cursor = index.progressive_search("words").unwrap();
        let mut seen = Vec::new();
        loop {
            let page = cursor.next(3, None);
            seen.extend(page.hits.into_iter().map(|h| h.uri));
            if !page.more_available {
                break;
            }
        }
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(seen.len(), 7);
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_no_matches_gives_one_final_page() {
        let index = index_with(3);
        let cursor = index.progressive_search("absent").unwrap();
        let page = cursor.next(10, None);
        assert!(page.is_empty());
        assert!(!page.more_available);
    }

    #[test]
    fn test_zero_timeout_still_progresses() {
        let index = index_with(200);
        let cursor = index.progressive_search("shared").unwrap();
        let mut total = 0;
        for _ in 0..1000 {
            let page = cursor.next(50, Some(Duration::ZERO));
            total += page.len();
            if !page.more_available {
                break;
            }
        }
        assert_eq!(total, 200);
    }

    #[test]
    fn test_cancel() {
        let index = index_with(5);
        let cursor = index.progressive_search("shared").unwrap();
        assert_eq!(cursor.next(2, None).len(), 2);
        cursor.cancel();
        let page = cursor.next(2, None);
        assert!(page.is_empty());
        assert!(!page.more_available);
        assert_eq!(cursor.state(), CursorState::Cancelled);
    }

    #[test]
    fn test_ranked_cursor_skips_documents_removed_later() {
        let index = index_with(5);
        let cursor = index.progressive_search("shared").unwrap();
        let first: Vec<String> = cursor.next(2, None).hits.into_iter().map(|h| h.uri).collect();
        assert_eq!(first.len(), 2);

        let removed = (0..5)
            .map(|i| format!("doc://{i}"))
            .find(|uri| !first.contains(uri))
            .unwrap();
        assert!(index.remove(&removed).unwrap());
        index.flush().unwrap();

        let rest = cursor.next(10, None);
        assert!(!rest.more_available);
        assert_eq!(rest.len(), 2);
        assert!(rest.uris().iter().all(|uri| *uri != removed));
    }

    #[test]
    fn test_closed_index_ends_cursor() {
        let index = index_with(5);
        let cursor = index.progressive_search("shared").unwrap();
        index.close().unwrap();
        let page = cursor.next(2, None);
        assert!(page.is_empty());
        assert!(!page.more_available);
    }
}
