//! Text analysis for Quire.
//!
//! Tokenization, filtering and the analysis pipelines built from them.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;
