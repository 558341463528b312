//! Analyzer trait and implementations.
//!
//! An analyzer is the complete text processing pipeline, from raw text to
//! index terms:
//!
//! ```text
//! Raw Text → Analyzer → Token Stream → Index
//!             ↓
//!         Tokenizer
//!             ↓
//!         Filter 1 … Filter N
//! ```
//!
//! The same analyzer instance normalizes documents and query words, so a
//! word is matchable exactly when it would have been indexed.

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub mod pipeline;

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}
