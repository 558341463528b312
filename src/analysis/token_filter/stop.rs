//! Stop word removal.
//!
//! Stop words are stored lower-cased and tokens are compared lower-cased,
//! so a stop list of `["Caterpillars"]` removes `caterpillars` wherever the
//! filter sits in the pipeline. Removed tokens leave a position gap.
//!
//! # Examples
//!
//! ```
//! use quire::analysis::token_filter::Filter;
//! use quire::analysis::token_filter::stop::StopFilter;
//! use quire::analysis::token::Token;
//!
//! let filter = StopFilter::from_words(["the"]);
//! let tokens = vec![Token::new("the", 0), Token::new("cat", 1)];
//! let kept: Vec<_> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();
//!
//! assert_eq!(kept.len(), 1);
//! assert_eq!(kept[0].position, 1);
//! ```

use std::sync::{Arc, LazyLock};

use ahash::AHashSet;

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Common English function words.
pub const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// [`DEFAULT_ENGLISH_STOP_WORDS`] as a set.
pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<AHashSet<String>> =
    LazyLock::new(|| DEFAULT_ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()).collect());

/// Drops tokens whose text is in the stop set.
#[derive(Clone, Debug)]
pub struct StopFilter {
    words: Arc<AHashSet<String>>,
}

impl StopFilter {
    /// Build a filter from arbitrary-case words; blanks are ignored.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        StopFilter {
            words: Arc::new(words),
        }
    }

    /// The built-in English list.
    pub fn english() -> Self {
        StopFilter {
            words: Arc::new(DEFAULT_ENGLISH_STOP_WORDS_SET.clone()),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.words.contains(word) || self.words.contains(&word.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        if self.is_empty() {
            return Ok(tokens);
        }
        let words = self.clone();
        Ok(Box::new(tokens.filter(move |token| !words.is_stop_word(&token.text))))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn kept(filter: &StopFilter, words: &[&str]) -> Vec<(String, usize)> {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| (t.text, t.position))
            .collect()
    }

    #[test]
    fn test_english_list() {
        let filter = StopFilter::english();
        assert!(filter.is_stop_word("the"));
        assert!(filter.is_stop_word("The"));
        assert!(!filter.is_stop_word("fish"));
    }

    #[test]
    fn test_custom_words_are_case_insensitive() {
        let filter = StopFilter::from_words(["Caterpillars", "  "]);
        assert_eq!(
            kept(&filter, &["caterpillars", "Caterpillars", "moths"]),
            vec![("moths".to_string(), 2)]
        );
    }

    #[test]
    fn test_empty_list_passes_everything() {
        let filter = StopFilter::from_words(Vec::<String>::new());
        assert!(filter.is_empty());
        assert_eq!(kept(&filter, &["the", "cat"]).len(), 2);
    }
}
