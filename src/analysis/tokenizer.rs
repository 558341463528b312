//! Tokenizer implementations for text analysis.
//!
//! Tokenizers are the first stage of the analysis pipeline. They split raw
//! text into [`Token`](crate::analysis::token::Token)s and hand them to the
//! filters as a lazy [`TokenStream`].
//!
//! # Available Tokenizers
//!
//! - [`char_class::CharClassTokenizer`] - Splits on non-alphanumeric boundaries,
//!   with configurable extra start, inner and end characters

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod char_class;

/// Trait for tokenizers that convert text into tokens.
///
/// The returned stream is independent of the input borrow, so a tokenizer
/// may be called again while an earlier stream is still being consumed.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
