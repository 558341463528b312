//! Minimum term length filter.

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Drops tokens with fewer than `min_length` characters.
///
/// Length is counted in Unicode scalar values, not bytes, so "été" has
/// length 3.
#[derive(Clone, Debug)]
pub struct MinLengthFilter {
    min_length: usize,
}

impl MinLengthFilter {
    /// Create a filter keeping tokens of at least `min_length` characters.
    pub fn new(min_length: usize) -> Self {
        MinLengthFilter { min_length }
    }

    /// The configured minimum.
    pub fn min_length(&self) -> usize {
        self.min_length
    }
}

impl Filter for MinLengthFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let min_length = self.min_length;
        if min_length <= 1 {
            // The tokenizer never emits empty tokens.
            return Ok(tokens);
        }
        Ok(Box::new(tokens.filter(move |token| {
            token.text.chars().take(min_length).count() >= min_length
        })))
    }

    fn name(&self) -> &'static str {
        "min_length"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    fn apply(min_length: usize, words: &[&str]) -> Vec<String> {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        MinLengthFilter::new(min_length)
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_drops_short_terms() {
        let words = ["cat", "dog", "fish", "pelican", "owl", "be"];
        assert_eq!(apply(4, &words), vec!["fish", "pelican"]);
        assert_eq!(apply(3, &words).len(), 5);
        assert_eq!(apply(5, &words), vec!["pelican"]);
        assert_eq!(apply(1, &words).len(), 6);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        assert_eq!(apply(3, &["été", "ü"]), vec!["été"]);
    }
}
