//! Query execution against committed index state.
//!
//! A [`QueryPlan`] resolves a parsed query once: prefix clauses are expanded
//! to concrete terms, idf weights are fixed, and each group's candidate set
//! is computed by intersecting posting lists. Candidates are then scored one
//! at a time by a [`Scan`], which can stop at a deadline or on cancellation
//! and resume later from where it left off.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use ahash::AHashMap;

use crate::index::document::{DocId, DocumentStore};
use crate::index::inverted::InvertedIndex;
use crate::query::collector::ScoredDoc;
use crate::query::parser::{Clause, ParsedQuery, PhraseTerm};
use crate::query::scoring::{idf, tf_weight};

/// Candidates scored between deadline checks.
pub(crate) const SCAN_BATCH: usize = 16;

/// Read-only view of committed state used during a search.
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub store: &'a DocumentStore,
    pub inverted: &'a InvertedIndex,
    /// Maximum span of a proximity match; `None` when positions are not stored.
    pub proximity_window: Option<u32>,
}

#[derive(Debug, Clone)]
enum ResolvedClause {
    /// Matches if any of the terms occurs.
    AnyOf(Vec<String>),
    /// Matches if the terms occur at their offsets.
    Phrase(Vec<PhraseTerm>),
}

#[derive(Debug, Clone)]
struct GroupPlan {
    must: Vec<ResolvedClause>,
    must_not: Vec<ResolvedClause>,
    /// Sorted doc ids containing every positive clause's terms.
    candidates: Vec<DocId>,
}

/// A resolved query ready to score documents.
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    groups: Vec<GroupPlan>,
    idf: AHashMap<String, f32>,
}

impl QueryPlan {
    /// Resolve `query` against the current committed state.
    pub fn build(query: &ParsedQuery, ctx: &SearchContext<'_>) -> Self {
        let mut plan = QueryPlan::default();
        let live_docs = ctx.store.live_count();

        for group in query.groups.iter().filter(|g| g.is_matchable()) {
            let must: Vec<ResolvedClause> =
                group.must.iter().map(|c| resolve(c, ctx.inverted)).collect();
            let must_not: Vec<ResolvedClause> =
                group.must_not.iter().map(|c| resolve(c, ctx.inverted)).collect();

            for clause in must.iter().chain(must_not.iter()) {
                for term in clause.terms() {
                    if !plan.idf.contains_key(term) {
                        let df = live_doc_ids(ctx, term).len();
                        plan.idf.insert(term.to_string(), idf(live_docs, df));
                    }
                }
            }

            let mut candidates: Option<Vec<DocId>> = None;
            for clause in &must {
                let docs = clause_doc_ids(clause, ctx);
                candidates = Some(match candidates {
                    None => docs,
                    Some(current) => intersect(&current, &docs),
                });
                if candidates.as_ref().is_some_and(Vec::is_empty) {
                    break;
                }
            }

            plan.groups.push(GroupPlan {
                must,
                must_not,
                candidates: candidates.unwrap_or_default(),
            });
        }

        plan
    }

    /// Union of all group candidates, sorted and deduplicated.
    pub fn candidates(&self) -> Vec<DocId> {
        let mut all: Vec<DocId> = self
            .groups
            .iter()
            .flat_map(|g| g.candidates.iter().copied())
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Score a document, or `None` if it does not match.
    ///
    /// A document matching several groups gets its best group score.
    pub fn score(&self, doc_id: DocId, ctx: &SearchContext<'_>) -> Option<f32> {
        if !ctx.store.is_live(doc_id) {
            return None;
        }
        self.groups
            .iter()
            .filter(|g| g.candidates.binary_search(&doc_id).is_ok())
            .filter_map(|g| self.score_group(g, doc_id, ctx))
            .reduce(f32::max)
    }

    fn score_group(&self, group: &GroupPlan, doc_id: DocId, ctx: &SearchContext<'_>) -> Option<f32> {
        if group
            .must_not
            .iter()
            .any(|clause| self.evaluate(clause, doc_id, ctx).is_some())
        {
            return None;
        }

        let mut total = 0.0;
        let mut position_lists = Vec::with_capacity(group.must.len());
        for clause in &group.must {
            let matched = self.evaluate(clause, doc_id, ctx)?;
            total += matched.score;
            position_lists.push(matched.positions);
        }

        if let Some(window) = ctx.proximity_window
            && position_lists.len() >= 2
        {
            let span = min_covering_span(&position_lists)?;
            if span > window {
                return None;
            }
        }

        Some(total)
    }

    fn evaluate(&self, clause: &ResolvedClause, doc_id: DocId, ctx: &SearchContext<'_>) -> Option<ClauseMatch> {
        match clause {
            ResolvedClause::AnyOf(terms) => {
                let mut score = 0.0;
                let mut positions: Vec<u32> = Vec::new();
                let mut found = false;
                for term in terms {
                    let Some(posting) = ctx.inverted.postings(term).and_then(|l| l.get(doc_id))
                    else {
                        continue;
                    };
                    found = true;
                    score += tf_weight(posting.frequency) * self.idf_of(term);
                    if let Some(p) = posting.positions() {
                        positions.extend_from_slice(p);
                    }
                }
                if !found {
                    return None;
                }
                positions.sort_unstable();
                Some(ClauseMatch { score, positions })
            }
            ResolvedClause::Phrase(terms) => {
                let mut postings = Vec::with_capacity(terms.len());
                for phrase_term in terms {
                    postings.push(ctx.inverted.postings(&phrase_term.term)?.get(doc_id)?);
                }

                let starts = if ctx.inverted.stores_positions() {
                    let first = postings[0].positions().unwrap_or(&[]);
                    let starts: Vec<u32> = first
                        .iter()
                        .filter_map(|&p| p.checked_sub(terms[0].offset))
                        .filter(|&start| {
                            terms.iter().zip(&postings).all(|(t, posting)| {
                                posting
                                    .positions()
                                    .unwrap_or(&[])
                                    .binary_search(&(start + t.offset))
                                    .is_ok()
                            })
                        })
                        .collect();
                    if starts.is_empty() {
                        return None;
                    }
                    starts
                } else {
                    Vec::new()
                };

                let score = terms
                    .iter()
                    .zip(&postings)
                    .map(|(t, posting)| tf_weight(posting.frequency) * self.idf_of(&t.term))
                    .sum();
                Some(ClauseMatch {
                    score,
                    positions: starts,
                })
            }
        }
    }

    fn idf_of(&self, term: &str) -> f32 {
        self.idf.get(term).copied().unwrap_or(0.0)
    }
}

struct ClauseMatch {
    score: f32,
    positions: Vec<u32>,
}

impl ResolvedClause {
    fn terms(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            ResolvedClause::AnyOf(terms) => Box::new(terms.iter().map(String::as_str)),
            ResolvedClause::Phrase(terms) => Box::new(terms.iter().map(|t| t.term.as_str())),
        }
    }
}

fn resolve(clause: &Clause, inverted: &InvertedIndex) -> ResolvedClause {
    match clause {
        Clause::Term(term) => ResolvedClause::AnyOf(vec![term.clone()]),
        Clause::Prefix(prefix) => ResolvedClause::AnyOf(
            inverted
                .prefix_postings(prefix)
                .map(|list| list.term.clone())
                .collect(),
        ),
        Clause::Phrase(terms) => ResolvedClause::Phrase(terms.clone()),
    }
}

fn live_doc_ids(ctx: &SearchContext<'_>, term: &str) -> Vec<DocId> {
    ctx.inverted
        .postings(term)
        .map(|list| {
            list.iter()
                .map(|p| p.doc_id)
                .filter(|&id| ctx.store.is_live(id))
                .collect()
        })
        .unwrap_or_default()
}

fn clause_doc_ids(clause: &ResolvedClause, ctx: &SearchContext<'_>) -> Vec<DocId> {
    match clause {
        ResolvedClause::AnyOf(terms) => {
            let mut ids: Vec<DocId> = terms.iter().flat_map(|t| live_doc_ids(ctx, t)).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        }
        ResolvedClause::Phrase(terms) => terms
            .iter()
            .map(|t| live_doc_ids(ctx, &t.term))
            .reduce(|acc, ids| intersect(&acc, &ids))
            .unwrap_or_default(),
    }
}

/// Intersect two sorted id lists.
fn intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Smallest `max - min` over windows holding one position from every list.
///
/// Returns `None` if any list is empty.
pub fn min_covering_span(lists: &[Vec<u32>]) -> Option<u32> {
    if lists.iter().any(Vec::is_empty) {
        return None;
    }
    let mut cursors = vec![0usize; lists.len()];
    let mut best = u32::MAX;

    loop {
        let mut min_list = 0;
        let mut min_pos = u32::MAX;
        let mut max_pos = 0;
        for (i, list) in lists.iter().enumerate() {
            let pos = list[cursors[i]];
            if pos < min_pos {
                min_pos = pos;
                min_list = i;
            }
            max_pos = max_pos.max(pos);
        }
        best = best.min(max_pos - min_pos);

        cursors[min_list] += 1;
        if cursors[min_list] >= lists[min_list].len() {
            return Some(best);
        }
    }
}

/// Outcome of one scan call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every candidate has been scored.
    Complete,
    /// The deadline passed first.
    TimedOut,
    /// The cancel flag was raised.
    Cancelled,
}

/// Resumable scoring pass over a plan's candidates.
#[derive(Debug, Clone)]
pub struct Scan {
    candidates: Vec<DocId>,
    next: usize,
    hits: Vec<ScoredDoc>,
}

impl Scan {
    /// Start a scan over the plan's candidates.
    pub fn new(plan: &QueryPlan) -> Self {
        Scan {
            candidates: plan.candidates(),
            next: 0,
            hits: Vec::new(),
        }
    }

    /// Score candidates until done, past `deadline`, or cancelled.
    ///
    /// At least one batch is scored per call, so repeated calls with a tiny
    /// timeout still make progress.
    pub fn run(
        &mut self,
        plan: &QueryPlan,
        ctx: &SearchContext<'_>,
        deadline: Option<Instant>,
        cancelled: &AtomicBool,
    ) -> ScanStatus {
        while self.next < self.candidates.len() {
            if cancelled.load(Ordering::Acquire) {
                return ScanStatus::Cancelled;
            }

            let end = (self.next + SCAN_BATCH).min(self.candidates.len());
            for &doc_id in &self.candidates[self.next..end] {
                if let Some(score) = plan.score(doc_id, ctx) {
                    self.hits.push(ScoredDoc { doc_id, score });
                }
            }
            self.next = end;

            if self.next < self.candidates.len() && deadline.is_some_and(|d| Instant::now() >= d) {
                return ScanStatus::TimedOut;
            }
        }
        ScanStatus::Complete
    }

    /// Matches found so far, in doc id order.
    pub fn hits(&self) -> &[ScoredDoc] {
        &self.hits
    }

    /// Take the matches found so far.
    pub fn into_hits(self) -> Vec<ScoredDoc> {
        self.hits
    }
}
