//! Analyzed terms.
//!
//! A [`Token`] is one term occurrence flowing through the analysis pipeline.
//! Its `position` is the index of the raw token in the source text, so
//! filters that drop tokens leave gaps instead of renumbering. Proximity
//! matching depends on those gaps: "feeling the blues" keeps `blues` two
//! positions after `feeling` even when `the` is a stop word.
//!
//! # Examples
//!
//! ```
//! use quire::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.span(), 6..11);
//! ```

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A single analyzed term occurrence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Term text after normalization.
    pub text: String,

    /// Index of the token in the raw token stream (0-based).
    pub position: usize,

    /// Byte offset where the term starts in the source text.
    pub start_offset: usize,

    /// Byte offset just past the term in the source text.
    pub end_offset: usize,
}

impl Token {
    /// A token at `position` whose offsets cover `text` from byte 0.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        let text = text.into();
        let end_offset = text.len();
        Token {
            text,
            position,
            start_offset: 0,
            end_offset,
        }
    }

    /// A token with byte offsets into the source text.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
        }
    }

    /// Source bytes the term was read from.
    pub fn span(&self) -> Range<usize> {
        self.start_offset..self.end_offset
    }

    /// Number of characters in the term.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Replace the text, keeping position and offsets.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.text, self.position)
    }
}

/// Lazy sequence of tokens produced by a tokenizer or filter.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_defaults() {
        let token = Token::new("hello", 3);
        assert_eq!(token.position, 3);
        assert_eq!(token.span(), 0..5);
        assert_eq!(token.to_string(), "hello@3");
    }

    #[test]
    fn test_with_text_keeps_position() {
        let source = "Grüße aus Über";
        let token = Token::with_offsets("Über", 2, 11, source.len()).with_text("über");
        assert_eq!(token.text, "über");
        assert_eq!(token.position, 2);
        assert_eq!(&source[token.span()], "Über");
        assert_eq!(token.char_len(), 4);
    }
}
