//! Binary index format.
//!
//! ```text
//! magic "QUIRE\0IX" | version u16 | config (bincode, length-prefixed)
//! next_doc_id varint
//! doc count varint | { id varint, uri string, token_count varint, properties (bincode) }*
//! term count varint | { posting list }*
//! crc32 u32 of everything above
//! ```
//!
//! Only committed, live documents are written. Per-document term vectors are
//! not stored; they are rebuilt from the posting lists on decode, and every
//! posting must point at a stored document.

use std::collections::BTreeMap;

use ahash::AHashSet;
use bincode::Options;

use crate::error::{QuireError, Result};
use crate::index::config::IndexConfig;
use crate::index::document::{DocId, DocumentRecord, DocumentStore, MAX_DOC_ID};
use crate::index::inverted::InvertedIndex;
use crate::index::posting::PostingList;
use crate::index::property::PropertyMap;
use crate::storage::structured::{StructReader, StructWriter};

/// Leading bytes of every serialized index.
pub const MAGIC: &[u8; 8] = b"QUIRE\0IX";

/// Current format version.
pub const FORMAT_VERSION: u16 = 1;

/// Decoded index state.
#[derive(Debug)]
pub struct IndexImage {
    pub config: IndexConfig,
    pub store: DocumentStore,
    pub inverted: InvertedIndex,
}

fn bincode_encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::DefaultOptions::new().serialize(value)?)
}

fn bincode_decode<T: serde::de::DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T> {
    bincode::DefaultOptions::new()
        .with_limit(bytes.len() as u64)
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(|e| QuireError::corrupt(format!("invalid {what} block: {e}")))
}

/// Serialize the live part of an index.
pub fn encode_index(
    config: &IndexConfig,
    store: &DocumentStore,
    inverted: &InvertedIndex,
) -> Result<Vec<u8>> {
    let mut writer = StructWriter::new();
    writer.write_raw(MAGIC)?;
    writer.write_u16(FORMAT_VERSION)?;
    writer.write_bytes(&bincode_encode(config)?)?;
    writer.write_varint(store.next_doc_id())?;

    let live: Vec<&DocumentRecord> = store.live_records().collect();
    writer.write_varint(live.len() as u64)?;
    for record in &live {
        writer.write_varint(record.id)?;
        writer.write_string(&record.uri)?;
        writer.write_varint(record.token_count as u64)?;
        writer.write_bytes(&bincode_encode(&record.properties)?)?;
    }

    let with_positions = config.proximity_indexing;
    let mut lists: Vec<PostingList> = Vec::new();
    for list in inverted.iter() {
        if list.iter().all(|p| store.is_live(p.doc_id)) {
            lists.push(list.clone());
        } else {
            let mut live_list = list.clone();
            live_list.retain(|id| store.is_live(id));
            if !live_list.is_empty() {
                lists.push(live_list);
            }
        }
    }
    writer.write_varint(lists.len() as u64)?;
    for list in &lists {
        list.encode(&mut writer, with_positions)?;
    }

    Ok(writer.finish())
}

/// Deserialize an index, validating every structural invariant.
pub fn decode_index(data: &[u8]) -> Result<IndexImage> {
    if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
        return Err(QuireError::corrupt("not a quire index (bad magic)"));
    }
    let mut reader = StructReader::verified(data)?;
    reader.read_raw(MAGIC.len())?;

    let version = reader.read_u16()?;
    if version != FORMAT_VERSION {
        return Err(QuireError::corrupt(format!(
            "unsupported format version {version}"
        )));
    }

    let config: IndexConfig = bincode_decode(reader.read_bytes()?, "config")?;
    let config = config
        .validated()
        .map_err(|e| QuireError::corrupt(format!("invalid config: {e}")))?;
    let next_doc_id = reader.read_varint()?;
    if next_doc_id > MAX_DOC_ID {
        return Err(QuireError::corrupt(format!(
            "next document id {next_doc_id} out of range"
        )));
    }

    // id, uri length, token count, property length
    let doc_count = reader.read_len(4)?;
    let mut records: BTreeMap<DocId, DocumentRecord> = BTreeMap::new();
    let mut uris: AHashSet<String> = AHashSet::with_capacity(doc_count);
    let mut prev_id: Option<DocId> = None;

    for _ in 0..doc_count {
        let id = reader.read_varint()?;
        if prev_id.is_some_and(|prev| id <= prev) || id >= next_doc_id {
            return Err(QuireError::corrupt(format!("document id {id} out of order")));
        }
        prev_id = Some(id);

        let uri = reader.read_string()?;
        if !uris.insert(uri.clone()) {
            return Err(QuireError::corrupt(format!("duplicate document uri {uri}")));
        }
        let token_count = u32::try_from(reader.read_varint()?)
            .map_err(|_| QuireError::corrupt("token count out of range"))?;
        let properties: PropertyMap = bincode_decode(reader.read_bytes()?, "properties")?;

        records.insert(
            id,
            DocumentRecord {
                id,
                uri,
                terms: BTreeMap::new(),
                token_count,
                properties,
            },
        );
    }

    let with_positions = config.proximity_indexing;
    let mut inverted = InvertedIndex::new(with_positions);
    let term_count = reader.read_len(2)?;
    let mut prev_term: Option<String> = None;

    for _ in 0..term_count {
        let list = PostingList::decode(&mut reader, with_positions)?;
        if prev_term.as_deref().is_some_and(|prev| list.term.as_str() <= prev) {
            return Err(QuireError::corrupt(format!(
                "term '{}' out of order",
                list.term
            )));
        }
        for posting in list.iter() {
            let record = records.get_mut(&posting.doc_id).ok_or_else(|| {
                QuireError::corrupt(format!(
                    "posting for '{}' references unknown document {}",
                    list.term, posting.doc_id
                ))
            })?;
            record.terms.insert(list.term.clone(), posting.frequency);
        }
        prev_term = Some(list.term.clone());
        inverted.insert_list(list);
    }

    if !reader.is_eof() {
        return Err(QuireError::corrupt(format!(
            "{} trailing bytes after index data",
            reader.remaining()
        )));
    }

    let store = DocumentStore::from_records(records.into_values().collect(), next_doc_id);
    Ok(IndexImage {
        config,
        store,
        inverted,
    })
}
