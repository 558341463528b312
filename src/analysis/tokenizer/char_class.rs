//! Character-class tokenizer.
//!
//! A term starts on an alphanumeric character or one of the configured start
//! characters, continues over alphanumerics, inner characters and end
//! characters, and has any trailing characters that are neither alphanumeric
//! nor end characters trimmed off. Everything else separates terms.
//!
//! # Examples
//!
//! ```
//! use quire::analysis::tokenizer::Tokenizer;
//! use quire::analysis::tokenizer::char_class::CharClassTokenizer;
//!
//! let tokenizer = CharClassTokenizer::new();
//! let terms: Vec<String> = tokenizer
//!     .tokenize("Today I am feeling fine, thankyou!")
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//!
//! assert_eq!(terms, vec!["Today", "I", "am", "feeling", "fine", "thankyou"]);
//! ```

use std::sync::Arc;

use ahash::AHashSet;

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

#[derive(Debug, Default)]
struct CharClasses {
    start: AHashSet<char>,
    inner: AHashSet<char>,
    end: AHashSet<char>,
}

impl CharClasses {
    fn can_start(&self, c: char) -> bool {
        c.is_alphanumeric() || self.start.contains(&c)
    }

    fn can_continue(&self, c: char) -> bool {
        c.is_alphanumeric() || self.inner.contains(&c) || self.end.contains(&c)
    }

    fn can_end(&self, c: char) -> bool {
        c.is_alphanumeric() || self.end.contains(&c)
    }
}

/// Tokenizer splitting on non-alphanumeric boundaries.
#[derive(Clone, Debug, Default)]
pub struct CharClassTokenizer {
    classes: Arc<CharClasses>,
}

impl CharClassTokenizer {
    /// Create a tokenizer that only accepts alphanumeric characters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tokenizer with extra start, inner and end characters.
    pub fn with_chars(start: &str, inner: &str, end: &str) -> Self {
        CharClassTokenizer {
            classes: Arc::new(CharClasses {
                start: start.chars().collect(),
                inner: inner.chars().collect(),
                end: end.chars().collect(),
            }),
        }
    }
}

impl Tokenizer for CharClassTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        Ok(Box::new(CharClassTokens {
            text: text.to_owned(),
            cursor: 0,
            position: 0,
            classes: Arc::clone(&self.classes),
        }))
    }

    fn name(&self) -> &'static str {
        "char_class"
    }
}

/// Lazy iterator over the terms of one text.
struct CharClassTokens {
    text: String,
    cursor: usize,
    position: usize,
    classes: Arc<CharClasses>,
}

impl Iterator for CharClassTokens {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = &self.text[self.cursor..];
        let (skip, _) = rest
            .char_indices()
            .find(|&(_, c)| self.classes.can_start(c))?;

        let start = self.cursor + skip;
        let mut scan_end = self.text.len();
        // Byte end of the last char that may legally end the term.
        let mut term_end = start;

        for (i, c) in self.text[start..].char_indices() {
            if i > 0 && !self.classes.can_continue(c) {
                scan_end = start + i;
                break;
            }
            if i == 0 || self.classes.can_end(c) {
                term_end = start + i + c.len_utf8();
            }
        }

        self.cursor = scan_end;
        let token = Token::with_offsets(&self.text[start..term_end], self.position, start, term_end);
        self.position += 1;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(tokenizer: &CharClassTokenizer, text: &str) -> Vec<String> {
        tokenizer.tokenize(text).unwrap().map(|t| t.text).collect()
    }

    #[test]
    fn test_splits_on_punctuation() {
        let tokenizer = CharClassTokenizer::new();
        assert_eq!(
            terms(&tokenizer, "cat, dog;fish...  pelican"),
            vec!["cat", "dog", "fish", "pelican"]
        );
        assert!(terms(&tokenizer, "  ,.;  ").is_empty());
    }

    #[test]
    fn test_positions_and_offsets() {
        let tokenizer = CharClassTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("Today I am feeling blue!").unwrap().collect();

        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[4].text, "blue");
        assert_eq!(tokens[4].position, 4);
        assert_eq!(tokens[4].start_offset, 19);
        assert_eq!(tokens[4].end_offset, 23);
    }

    #[test]
    fn test_unicode_terms() {
        let tokenizer = CharClassTokenizer::new();
        assert_eq!(terms(&tokenizer, "naïve café—über"), vec!["naïve", "café", "über"]);
    }

    #[test]
    fn test_extra_character_classes() {
        let tokenizer = CharClassTokenizer::with_chars("#", "'-", "+");
        assert_eq!(
            terms(&tokenizer, "#rust don't co-op c++ dogs'"),
            vec!["#rust", "don't", "co-op", "c++", "dogs"]
        );
    }

    #[test]
    fn test_stream_is_restartable() {
        let tokenizer = CharClassTokenizer::new();
        let first: Vec<Token> = tokenizer.tokenize("one two").unwrap().collect();
        let second: Vec<Token> = tokenizer.tokenize("one two").unwrap().collect();
        assert_eq!(first, second);
    }
}
