//! Posting lists.
//!
//! A [`PostingList`] holds every occurrence record of one term, sorted by
//! document id. Positions are present exactly when the index was created
//! with proximity indexing, in which case `positions.len() == frequency`.

use crate::error::{QuireError, Result};
use crate::index::document::DocId;
use crate::storage::structured::{StructReader, StructWriter};

/// A single posting in a posting list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    /// Document ID.
    pub doc_id: DocId,
    /// Term frequency in the document.
    pub frequency: u32,
    /// Ascending positions of the term in the document.
    pub positions: Option<Vec<u32>>,
}

impl Posting {
    /// Create a posting with a frequency and no positions.
    pub fn with_frequency(doc_id: DocId, frequency: u32) -> Self {
        Posting {
            doc_id,
            frequency,
            positions: None,
        }
    }

    /// Create a posting with positions.
    pub fn with_positions(doc_id: DocId, positions: Vec<u32>) -> Self {
        Posting {
            doc_id,
            frequency: positions.len() as u32,
            positions: Some(positions),
        }
    }

    /// Get positions if available.
    pub fn positions(&self) -> Option<&[u32]> {
        self.positions.as_deref()
    }
}

/// A posting list for a specific term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingList {
    /// The term this posting list represents.
    pub term: String,
    /// Postings sorted by doc id.
    pub postings: Vec<Posting>,
    /// Total frequency across all postings.
    pub total_frequency: u64,
}

impl PostingList {
    /// Create a new empty posting list.
    pub fn new(term: String) -> Self {
        PostingList {
            term,
            postings: Vec::new(),
            total_frequency: 0,
        }
    }

    /// Add a posting, keeping the list sorted by doc id.
    ///
    /// A posting for a doc id already present replaces the old one.
    pub fn add_posting(&mut self, posting: Posting) {
        self.total_frequency += posting.frequency as u64;

        if self
            .postings
            .last()
            .is_none_or(|last| last.doc_id < posting.doc_id)
        {
            self.postings.push(posting);
            return;
        }

        match self
            .postings
            .binary_search_by_key(&posting.doc_id, |p| p.doc_id)
        {
            Ok(pos) => {
                self.total_frequency -= self.postings[pos].frequency as u64;
                self.postings[pos] = posting;
            }
            Err(pos) => self.postings.insert(pos, posting),
        }
    }

    /// Find the posting for a document.
    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    /// Keep only postings whose document satisfies `keep`; returns how many were dropped.
    pub fn retain<F: Fn(DocId) -> bool>(&mut self, keep: F) -> usize {
        let before = self.postings.len();
        self.postings.retain(|p| keep(p.doc_id));
        self.total_frequency = self.postings.iter().map(|p| p.frequency as u64).sum();
        before - self.postings.len()
    }

    /// Get the length of the posting list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Check if the posting list is empty.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Get an iterator over the postings.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Encode the posting list.
    ///
    /// Doc ids and positions are delta-coded varints. Positions are written
    /// only when `with_positions` is set; the flag is part of the index
    /// configuration rather than the stream.
    pub fn encode(&self, writer: &mut StructWriter, with_positions: bool) -> Result<()> {
        writer.write_string(&self.term)?;
        writer.write_varint(self.postings.len() as u64)?;

        let mut prev_doc_id = 0u64;
        for posting in &self.postings {
            writer.write_varint(posting.doc_id - prev_doc_id)?;
            prev_doc_id = posting.doc_id;
            writer.write_varint(posting.frequency as u64)?;

            if with_positions {
                let positions = posting.positions().unwrap_or(&[]);
                if positions.len() != posting.frequency as usize {
                    return Err(QuireError::serialization(format!(
                        "posting for '{}' has {} positions but frequency {}",
                        self.term,
                        positions.len(),
                        posting.frequency
                    )));
                }
                let mut prev_pos = 0u32;
                for (i, &pos) in positions.iter().enumerate() {
                    let delta = if i == 0 { pos } else { pos - prev_pos };
                    writer.write_varint(delta as u64)?;
                    prev_pos = pos;
                }
            }
        }

        Ok(())
    }

    /// Decode a posting list, rejecting anything that breaks list invariants.
    pub fn decode(reader: &mut StructReader<'_>, with_positions: bool) -> Result<Self> {
        let term = reader.read_string()?;
        if term.is_empty() {
            return Err(QuireError::corrupt("empty term in posting list"));
        }
        // Each posting needs at least a delta byte and a frequency byte.
        let count = reader.read_len(2)?;

        let mut list = PostingList::new(term);
        list.postings.reserve(count);
        let mut prev_doc_id = 0u64;

        for i in 0..count {
            let delta = reader.read_varint()?;
            if i > 0 && delta == 0 {
                return Err(QuireError::corrupt("posting doc ids are not increasing"));
            }
            let doc_id = prev_doc_id
                .checked_add(delta)
                .ok_or_else(|| QuireError::corrupt("posting doc id overflow"))?;
            prev_doc_id = doc_id;

            let frequency = u32::try_from(reader.read_varint()?)
                .map_err(|_| QuireError::corrupt("posting frequency out of range"))?;
            if frequency == 0 {
                return Err(QuireError::corrupt("posting frequency is zero"));
            }

            let posting = if with_positions {
                if frequency as usize > reader.remaining() {
                    return Err(QuireError::corrupt("position count exceeds data"));
                }
                let mut positions = Vec::with_capacity(frequency as usize);
                let mut prev_pos = 0u32;
                for j in 0..frequency {
                    let delta = u32::try_from(reader.read_varint()?)
                        .map_err(|_| QuireError::corrupt("position out of range"))?;
                    if j > 0 && delta == 0 {
                        return Err(QuireError::corrupt("positions are not increasing"));
                    }
                    let pos = prev_pos
                        .checked_add(delta)
                        .ok_or_else(|| QuireError::corrupt("position overflow"))?;
                    positions.push(pos);
                    prev_pos = pos;
                }
                Posting::with_positions(doc_id, positions)
            } else {
                Posting::with_frequency(doc_id, frequency)
            };

            list.total_frequency += posting.frequency as u64;
            list.postings.push(posting);
        }

        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_posting_keeps_order() {
        let mut list = PostingList::new("cat".into());
        list.add_posting(Posting::with_frequency(5, 2));
        list.add_posting(Posting::with_frequency(1, 1));
        list.add_posting(Posting::with_frequency(9, 3));
        list.add_posting(Posting::with_frequency(5, 4));

        let ids: Vec<DocId> = list.iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![1, 5, 9]);
        assert_eq!(list.total_frequency, 8);
        assert_eq!(list.get(5).unwrap().frequency, 4);
        assert!(list.get(2).is_none());
    }

    #[test]
    fn test_retain() {
        let mut list = PostingList::new("dog".into());
        for id in 0..6 {
            list.add_posting(Posting::with_frequency(id, 1));
        }
        assert_eq!(list.retain(|id| id % 2 == 0), 3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.total_frequency, 3);
    }

    #[test]
    fn test_encode_decode_with_positions() {
        let mut list = PostingList::new("fish".into());
        list.add_posting(Posting::with_positions(3, vec![0, 4, 9]));
        list.add_posting(Posting::with_positions(10, vec![2]));

        let mut writer = StructWriter::new();
        list.encode(&mut writer, true).unwrap();
        let bytes = writer.into_inner();

        let mut reader = StructReader::new(&bytes);
        let decoded = PostingList::decode(&mut reader, true).unwrap();
        assert_eq!(decoded, list);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_encode_rejects_missing_positions() {
        let mut list = PostingList::new("fish".into());
        list.add_posting(Posting::with_frequency(1, 2));
        let mut writer = StructWriter::new();
        assert!(list.encode(&mut writer, true).is_err());
    }

    #[test]
    fn test_decode_rejects_zero_frequency() {
        let mut writer = StructWriter::new();
        writer.write_string("cat").unwrap();
        writer.write_varint(1).unwrap();
        writer.write_varint(0).unwrap();
        writer.write_varint(0).unwrap();
        let bytes = writer.into_inner();

        let err = PostingList::decode(&mut StructReader::new(&bytes), false).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_decode_rejects_inflated_count() {
        let mut writer = StructWriter::new();
        writer.write_string("cat").unwrap();
        writer.write_varint(u32::MAX as u64).unwrap();
        let bytes = writer.into_inner();

        let err = PostingList::decode(&mut StructReader::new(&bytes), false).unwrap_err();
        assert!(err.is_corrupt());
    }
}
