//! Collectors for gathering scored documents.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::index::document::DocId;

/// A scored document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

impl ScoredDoc {
    /// Result order: higher score first, then lower doc id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greater means better ranked.
impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other).reverse()
    }
}

/// A collector that keeps the top N documents by score.
#[derive(Debug)]
pub struct TopDocsCollector {
    max_docs: usize,
    /// Min-heap of the best documents seen so far.
    hits: BinaryHeap<Reverse<ScoredDoc>>,
    total_hits: usize,
}

impl TopDocsCollector {
    /// Create a collector keeping at most `max_docs` documents.
    pub fn new(max_docs: usize) -> Self {
        TopDocsCollector {
            max_docs,
            hits: BinaryHeap::new(),
            total_hits: 0,
        }
    }

    /// Offer a document.
    pub fn collect(&mut self, doc: ScoredDoc) {
        self.total_hits += 1;
        if self.max_docs == 0 {
            return;
        }
        if self.hits.len() < self.max_docs {
            self.hits.push(Reverse(doc));
        } else if let Some(Reverse(worst)) = self.hits.peek()
            && doc > *worst
        {
            self.hits.pop();
            self.hits.push(Reverse(doc));
        }
    }

    /// Number of documents offered.
    pub fn total_hits(&self) -> usize {
        self.total_hits
    }

    /// Kept documents, best first.
    pub fn into_sorted_vec(self) -> Vec<ScoredDoc> {
        let mut docs: Vec<ScoredDoc> = self.hits.into_iter().map(|Reverse(d)| d).collect();
        docs.sort_by(ScoredDoc::rank_cmp);
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(doc_id: DocId, score: f32) -> ScoredDoc {
        ScoredDoc { doc_id, score }
    }

    #[test]
    fn test_keeps_top_n_in_order() {
        let mut collector = TopDocsCollector::new(3);
        for (id, score) in [(1, 0.5), (2, 2.0), (3, 1.0), (4, 3.0), (5, 0.1)] {
            collector.collect(doc(id, score));
        }

        assert_eq!(collector.total_hits(), 5);
        let ids: Vec<DocId> = collector.into_sorted_vec().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![4, 2, 3]);
    }

    #[test]
    fn test_ties_break_by_doc_id() {
        let mut collector = TopDocsCollector::new(2);
        for id in [7, 3, 5] {
            collector.collect(doc(id, 1.0));
        }
        let ids: Vec<DocId> = collector.into_sorted_vec().iter().map(|d| d.doc_id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn test_zero_capacity_counts_only() {
        let mut collector = TopDocsCollector::new(0);
        collector.collect(doc(1, 1.0));
        assert_eq!(collector.total_hits(), 1);
        assert!(collector.into_sorted_vec().is_empty());
    }
}
