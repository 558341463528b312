//! Token filter implementations for token transformation.
//!
//! Filters take the stream produced by a tokenizer and return a new stream.
//! Every filter here is lazy: nothing is materialized until the caller
//! iterates.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseFilter`] - Converts tokens to lowercase
//! - [`min_length::MinLengthFilter`] - Drops tokens shorter than a character count
//! - [`stop::StopFilter`] - Removes stop words
//!
//! # Filter Chaining
//!
//! ```text
//! Tokenizer → Lowercase → Min Length → Stop Words → Index
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod lowercase;
pub mod min_length;
pub mod stop;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}
