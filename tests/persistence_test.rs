use tempfile::Builder;

use quire::prelude::*;

fn sample_properties() -> PropertyMap {
    let mut properties = PropertyMap::new();
    properties.insert("Fish".into(), 10.into());
    properties.insert("Cat".into(), "dog".into());
    properties
}

#[test]
fn test_memory_round_trip() {
    let index = Index::create(IndexConfig::default().with_proximity_indexing(true)).unwrap();
    index.add_text("doc://a", "red green blue", true).unwrap();
    index.add_text("doc://b", "green yellow", true).unwrap();
    index.add_text("doc://c", "to be removed", true).unwrap();
    index.flush().unwrap();
    index.set_properties("doc://a", sample_properties()).unwrap();
    index.remove("doc://c").unwrap();

    let bytes = index.to_bytes().unwrap();
    let loaded = Index::load(&bytes).unwrap();

    assert!(loaded.config().proximity_indexing);
    assert_eq!(
        loaded.documents(TermState::All).unwrap(),
        index.documents(TermState::All).unwrap()
    );
    assert_eq!(loaded.terms("doc://a").unwrap(), index.terms("doc://a").unwrap());
    assert_eq!(loaded.properties("doc://a").unwrap(), sample_properties());
    assert_eq!(
        loaded.search("green", 10, None).unwrap().uris(),
        index.search("green", 10, None).unwrap().uris()
    );
    assert!(loaded.search("removed", 10, None).unwrap().is_empty());
}

#[test]
fn test_load_rejects_garbage() {
    assert!(matches!(
        Index::load(b"hello"),
        Err(QuireError::CorruptData(_))
    ));
    assert!(Index::load(&[]).is_err());

    let index = Index::create(IndexConfig::default()).unwrap();
    index.add_text("doc", "content", true).unwrap();
    let mut bytes = index.to_bytes().unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    assert!(Index::load(&bytes).is_err());
}

#[test]
fn test_file_create_and_open() {
    let dir = Builder::new().prefix("quire-files").tempdir().unwrap();
    let path = dir.path().join("test.idx");

    assert!(matches!(
        Index::open_file(&path, true),
        Err(QuireError::NotFound(_))
    ));

    let index = Index::create_file(&path, IndexConfig::default()).unwrap();
    assert!(path.exists());
    assert!(matches!(
        Index::create_file(&path, IndexConfig::default()),
        Err(QuireError::AlreadyExists(_))
    ));

    index.add_text("doc://1", "Fish swim in water", true).unwrap();
    index.flush().unwrap();
    index.set_properties("doc://1", sample_properties()).unwrap();
    index.close().unwrap();

    let reopened = Index::open_file(&path, false).unwrap();
    assert!(!reopened.is_writable());
    assert_eq!(reopened.search("fish", 10, None).unwrap().uris(), vec!["doc://1"]);
    assert_eq!(reopened.properties("doc://1").unwrap(), sample_properties());
}

#[test]
fn test_read_only_rejects_mutations() {
    let dir = Builder::new().prefix("quire-readonly").tempdir().unwrap();
    let path = dir.path().join("test.idx");

    let index = Index::create_file(&path, IndexConfig::default()).unwrap();
    index.add_text("doc://1", "stable content", true).unwrap();
    index.close().unwrap();
    let before = std::fs::read(&path).unwrap();

    let read_only = Index::open_file(&path, false).unwrap();
    assert!(matches!(
        read_only.add_text("doc://2", "new", true),
        Err(QuireError::ReadOnly)
    ));
    assert!(matches!(read_only.remove("doc://1"), Err(QuireError::ReadOnly)));
    assert!(matches!(
        read_only.set_properties("doc://1", sample_properties()),
        Err(QuireError::ReadOnly)
    ));
    assert_eq!(read_only.search("stable", 10, None).unwrap().len(), 1);
    read_only.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_save_compacts_and_persists() {
    let dir = Builder::new().prefix("quire-save").tempdir().unwrap();
    let path = dir.path().join("test.idx");

    let index = Index::create_file(&path, IndexConfig::default()).unwrap();
    for i in 0..10 {
        index
            .add_text(&format!("doc://{i}"), "a fairly long body of repeated words", true)
            .unwrap();
    }
    index.save().unwrap();
    let full = std::fs::metadata(&path).unwrap().len();

    for i in 0..9 {
        index.remove(&format!("doc://{i}")).unwrap();
    }
    index.save().unwrap();
    let compacted = std::fs::metadata(&path).unwrap().len();
    assert!(compacted < full);

    let reopened = Index::open_file(&path, true).unwrap();
    assert_eq!(reopened.documents(TermState::All).unwrap(), vec!["doc://9"]);
}

#[test]
fn test_memory_index_cannot_save() {
    let index = Index::create(IndexConfig::default()).unwrap();
    assert!(matches!(index.save(), Err(QuireError::Unsupported(_))));
    assert!(index.path().is_none());
}
