use quire::summary::Summarizer;

const TEXT: &str = "Rust is a systems programming language. It is fast.\n\
\n\
Rust guarantees memory safety without a garbage collector. Memory safety in Rust comes from ownership.\n\
The weather was nice today.";

#[test]
fn test_segmentation_counts() {
    let summarizer = Summarizer::new(TEXT);
    assert_eq!(summarizer.paragraph_count(), 3);
    assert_eq!(summarizer.sentence_count(), 5);
}

#[test]
fn test_sentence_summary() {
    let summarizer = Summarizer::new(TEXT);
    let summary = summarizer.sentence_summary(2);
    assert_eq!(summary.len(), 2);

    let best = summary.iter().find(|s| s.rank == 1).unwrap();
    assert!(best.text.starts_with("Rust guarantees memory safety"));
    assert_eq!(best.paragraph_order, 1);
    assert!(summary.windows(2).all(|w| w[0].sentence_order < w[1].sentence_order));
    assert!(summary.iter().all(|s| !s.text.contains("weather")));
}

#[test]
fn test_requesting_more_than_available() {
    let summarizer = Summarizer::new(TEXT);
    assert_eq!(summarizer.sentence_summary(100).len(), 5);
    assert_eq!(summarizer.paragraph_summary(100).len(), 3);

    let mut ranks: Vec<usize> = summarizer
        .paragraph_summary(100)
        .into_iter()
        .map(|p| p.rank)
        .collect();
    ranks.sort();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn test_empty_text() {
    let summarizer = Summarizer::new("");
    assert_eq!(summarizer.sentence_count(), 0);
    assert!(summarizer.sentence_summary(3).is_empty());
    assert!(summarizer.paragraph_summary_text(3).is_empty());
}
