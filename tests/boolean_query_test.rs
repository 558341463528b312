//! Integration tests for boolean query syntax

use quire::prelude::*;

fn engine() -> Result<Index> {
    let index = Index::create(IndexConfig::default().with_proximity_indexing(true))?;
    index.add_text("doc1", "Python Programming. programming python beginner", true)?;
    index.add_text("doc2", "JavaScript Web Development. programming javascript web", true)?;
    index.add_text("doc3", "Cooking with Python. cooking python recipes", true)?;
    index.flush()?;
    Ok(index)
}

fn sorted_uris(results: &SearchResults) -> Vec<&str> {
    let mut uris = results.uris();
    uris.sort();
    uris
}

#[test]
fn test_boolean_query_must_not() -> Result<()> {
    let index = engine()?;

    // A lone exclusion has nothing to match against.
    let results = index.search("NOT javascript", 10, None)?;
    assert!(results.is_empty());

    let results = index.search("python NOT javascript", 10, None)?;
    assert_eq!(sorted_uris(&results), vec!["doc1", "doc3"]);

    let results = index.search("programming -javascript", 10, None)?;
    assert_eq!(results.uris(), vec!["doc1"]);

    let results = index.search("programming !web", 10, None)?;
    assert_eq!(results.uris(), vec!["doc1"]);

    Ok(())
}

#[test]
fn test_boolean_query_should() -> Result<()> {
    let index = engine()?;

    let results = index.search("javascript OR cooking", 10, None)?;
    assert_eq!(sorted_uris(&results), vec!["doc2", "doc3"]);

    let results = index.search("javascript | recipes | beginner", 10, None)?;
    assert_eq!(results.len(), 3);

    let results = index.search("python AND cooking", 10, None)?;
    assert_eq!(results.uris(), vec!["doc3"]);

    Ok(())
}

#[test]
fn test_prefix_and_phrase() -> Result<()> {
    let index = engine()?;

    let results = index.search("prog*", 10, None)?;
    assert_eq!(sorted_uris(&results), vec!["doc1", "doc2"]);

    let results = index.search("\"web development\"", 10, None)?;
    assert_eq!(results.uris(), vec!["doc2"]);

    let results = index.search("\"development web\"", 10, None)?;
    assert!(results.is_empty());

    let results = index.search("cook* python", 10, None)?;
    assert_eq!(results.uris(), vec!["doc3"]);

    Ok(())
}
