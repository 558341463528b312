//! Extractive summarization.
//!
//! Text is split into paragraphs at line breaks (blank lines are ignored)
//! and each paragraph into sentences at Unicode sentence boundaries. A unit's
//! salience is the summed document-wide frequency of its words, English stop
//! words excluded, divided by the square root of its word count, so long
//! units do not win on length alone.
//!
//! # Examples
//!
//! ```
//! use quire::summary::Summarizer;
//!
//! let summarizer = Summarizer::new("Fish swim. Fish eat.\nBirds fly over fish.");
//! assert_eq!(summarizer.paragraph_count(), 2);
//! assert_eq!(summarizer.sentence_count(), 3);
//!
//! let top = summarizer.sentence_summary(1);
//! assert_eq!(top[0].rank, 1);
//! ```

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token_filter::stop::DEFAULT_ENGLISH_STOP_WORDS_SET;

/// A sentence selected for a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySentence {
    pub text: String,
    /// 1 for the most salient sentence.
    pub rank: usize,
    /// Position among all sentences of the text.
    pub sentence_order: usize,
    /// Paragraph containing the sentence.
    pub paragraph_order: usize,
}

/// A paragraph selected for a summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryParagraph {
    pub text: String,
    /// 1 for the most salient paragraph.
    pub rank: usize,
    /// Position among all paragraphs of the text.
    pub paragraph_order: usize,
}

#[derive(Debug, Clone)]
struct Unit {
    text: String,
    paragraph: usize,
    salience: f32,
}

/// Segments a text and ranks its sentences and paragraphs.
#[derive(Debug, Clone)]
pub struct Summarizer {
    sentences: Vec<Unit>,
    paragraphs: Vec<Unit>,
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words().map(str::to_lowercase)
}

fn salience(text: &str, frequencies: &AHashMap<String, usize>) -> f32 {
    let mut total = 0usize;
    let mut count = 0usize;
    for word in words(text) {
        count += 1;
        total += frequencies.get(&word).copied().unwrap_or(0);
    }
    if count == 0 {
        0.0
    } else {
        total as f32 / (count as f32).sqrt()
    }
}

/// Ranks of the units, 1-based, by salience then original order.
fn ranks(units: &[Unit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by(|&a, &b| {
        units[b]
            .salience
            .total_cmp(&units[a].salience)
            .then(a.cmp(&b))
    });
    let mut ranks = vec![0; units.len()];
    for (rank, index) in order.into_iter().enumerate() {
        ranks[index] = rank + 1;
    }
    ranks
}

/// Indices of the `max` best units, in original order.
fn select(ranks: &[usize], max: usize) -> impl Iterator<Item = usize> + '_ {
    (0..ranks.len()).filter(move |&i| ranks[i] <= max)
}

impl Summarizer {
    /// Segment and score `text`.
    pub fn new(text: &str) -> Self {
        let mut frequencies: AHashMap<String, usize> = AHashMap::new();
        for word in words(text) {
            if !DEFAULT_ENGLISH_STOP_WORDS_SET.contains(&word) {
                *frequencies.entry(word).or_insert(0) += 1;
            }
        }

        let mut paragraphs = Vec::new();
        let mut sentences = Vec::new();
        for (paragraph, line) in text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
        {
            for sentence in line.split_sentence_bounds().map(str::trim) {
                if sentence.is_empty() {
                    continue;
                }
                sentences.push(Unit {
                    text: sentence.to_string(),
                    paragraph,
                    salience: salience(sentence, &frequencies),
                });
            }
            paragraphs.push(Unit {
                text: line.to_string(),
                paragraph,
                salience: salience(line, &frequencies),
            });
        }

        Summarizer {
            sentences,
            paragraphs,
        }
    }

    /// Number of sentences.
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Number of non-blank paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Up to `max` most salient sentences, in text order.
    pub fn sentence_summary(&self, max: usize) -> Vec<SummarySentence> {
        let ranks = ranks(&self.sentences);
        select(&ranks, max)
            .map(|i| SummarySentence {
                text: self.sentences[i].text.clone(),
                rank: ranks[i],
                sentence_order: i,
                paragraph_order: self.sentences[i].paragraph,
            })
            .collect()
    }

    /// Up to `max` most salient paragraphs, in text order.
    pub fn paragraph_summary(&self, max: usize) -> Vec<SummaryParagraph> {
        let ranks = ranks(&self.paragraphs);
        select(&ranks, max)
            .map(|i| SummaryParagraph {
                text: self.paragraphs[i].text.clone(),
                rank: ranks[i],
                paragraph_order: self.paragraphs[i].paragraph,
            })
            .collect()
    }

    /// The sentence summary joined into one string.
    pub fn sentence_summary_text(&self, max: usize) -> String {
        self.sentence_summary(max)
            .into_iter()
            .map(|s| s.text)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The paragraph summary joined with line breaks.
    pub fn paragraph_summary_text(&self, max: usize) -> String {
        self.paragraph_summary(max)
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "The harbour was quiet. Fishing boats rested at the pier.\n\
                        \n\
                        Fish markets open early. Fish prices rise with demand for fish.\n\
                        Gulls circled.";

    #[test]
    fn test_counts() {
        let summarizer = Summarizer::new(TEXT);
        assert_eq!(summarizer.paragraph_count(), 3);
        assert_eq!(summarizer.sentence_count(), 5);
    }

    #[test]
    fn test_sentence_summary_honours_count() {
        let summarizer = Summarizer::new(TEXT);
        for max in 0..=5 {
            assert_eq!(summarizer.sentence_summary(max).len(), max);
        }
        assert_eq!(summarizer.sentence_summary(50).len(), 5);
    }

    #[test]
    fn test_summary_keeps_text_order() {
        let summarizer = Summarizer::new(TEXT);
        let summary = summarizer.sentence_summary(3);
        let orders: Vec<usize> = summary.iter().map(|s| s.sentence_order).collect();
        let mut sorted = orders.clone();
        sorted.sort();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn test_most_salient_sentence() {
        let summarizer = Summarizer::new(TEXT);
        let best = summarizer.sentence_summary(1);
        assert_eq!(best[0].text, "Fish prices rise with demand for fish.");
        assert_eq!(best[0].rank, 1);
        assert_eq!(best[0].paragraph_order, 1);
        assert_eq!(best[0].sentence_order, 3);
    }

    #[test]
    fn test_paragraph_summary() {
        let summarizer = Summarizer::new(TEXT);
        let best = summarizer.paragraph_summary(1);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].paragraph_order, 1);
        assert_eq!(summarizer.paragraph_summary(10).len(), 3);
        assert_eq!(summarizer.paragraph_summary_text(3).lines().count(), 3);
    }

    #[test]
    fn test_empty_text() {
        let summarizer = Summarizer::new("  \n\n");
        assert_eq!(summarizer.sentence_count(), 0);
        assert_eq!(summarizer.paragraph_count(), 0);
        assert!(summarizer.sentence_summary(3).is_empty());
        assert_eq!(summarizer.sentence_summary_text(3), "");
    }
}
