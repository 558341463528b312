//! Tokenizer followed by a chain of filters.
//!
//! [`IndexConfig::analyzer`](crate::index::config::IndexConfig::analyzer)
//! assembles the standard pipeline; building one by hand is mostly useful in
//! tests.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use quire::analysis::analyzer::pipeline::PipelineAnalyzer;
//! use quire::analysis::token_filter::lowercase::LowercaseFilter;
//! use quire::analysis::token_filter::stop::StopFilter;
//! use quire::analysis::tokenizer::char_class::CharClassTokenizer;
//!
//! let analyzer = PipelineAnalyzer::new(Arc::new(CharClassTokenizer::new()))
//!     .add_filter(Arc::new(LowercaseFilter::new()))
//!     .add_filter(Arc::new(StopFilter::from_words(["the", "and"])));
//!
//! assert_eq!(
//!     analyzer.terms("Hello THE world AND test").unwrap(),
//!     vec!["hello", "world", "test"]
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::analysis::tokenizer::Tokenizer;
use crate::error::Result;

/// Runs the tokenizer, then each filter in the order added.
#[derive(Clone)]
pub struct PipelineAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    filters: Vec<Arc<dyn Filter>>,
}

impl PipelineAnalyzer {
    pub fn new(tokenizer: Arc<dyn Tokenizer>) -> Self {
        PipelineAnalyzer {
            tokenizer,
            filters: Vec::new(),
        }
    }

    /// Append a filter to the end of the chain.
    pub fn add_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Term texts of `text` in stream order, duplicates kept.
    pub fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }
}

impl Analyzer for PipelineAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.filters
            .iter()
            .try_fold(self.tokenizer.tokenize(text)?, |tokens, filter| {
                filter.filter(tokens)
            })
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}

impl fmt::Debug for PipelineAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<&str> = std::iter::once(self.tokenizer.name())
            .chain(self.filters.iter().map(|filter| filter.name()))
            .collect();
        write!(f, "PipelineAnalyzer({})", chain.join(" > "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token_filter::lowercase::LowercaseFilter;
    use crate::analysis::token_filter::min_length::MinLengthFilter;
    use crate::analysis::token_filter::stop::StopFilter;
    use crate::analysis::tokenizer::char_class::CharClassTokenizer;

    #[test]
    fn test_filters_run_in_order() {
        let analyzer = PipelineAnalyzer::new(Arc::new(CharClassTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(MinLengthFilter::new(3)))
            .add_filter(Arc::new(StopFilter::from_words(["THE"])));

        assert_eq!(
            analyzer.terms("The Cat sat on THE mat").unwrap(),
            vec!["cat", "sat", "mat"]
        );
    }

    #[test]
    fn test_positions_survive_filtering() {
        let analyzer = PipelineAnalyzer::new(Arc::new(CharClassTokenizer::new()))
            .add_filter(Arc::new(StopFilter::from_words(["am"])));
        let positions: Vec<usize> = analyzer
            .analyze("I am feeling fine")
            .unwrap()
            .map(|t| t.position)
            .collect();
        assert_eq!(positions, vec![0, 2, 3]);
    }

    #[test]
    fn test_debug_shows_chain() {
        let analyzer = PipelineAnalyzer::new(Arc::new(CharClassTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()));
        assert_eq!(
            format!("{analyzer:?}"),
            "PipelineAnalyzer(char_class > lowercase)"
        );
    }
}
