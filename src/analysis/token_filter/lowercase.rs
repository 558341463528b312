//! Case folding.
//!
//! Index terms and query words both pass through this filter, which is what
//! makes matching case-insensitive.

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

/// Folds every term to lowercase with Unicode rules.
#[derive(Clone, Debug, Default)]
pub struct LowercaseFilter;

impl LowercaseFilter {
    pub fn new() -> Self {
        LowercaseFilter
    }
}

impl Filter for LowercaseFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        Ok(Box::new(tokens.map(|token| {
            if token.text.chars().any(char::is_uppercase) {
                let folded = token.text.to_lowercase();
                token.with_text(folded)
            } else {
                token
            }
        })))
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }
}
