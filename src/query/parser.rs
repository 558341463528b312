//! Query parser.
//!
//! Turns a query string into a disjunction of conjunctive groups. Words are
//! normalized by the index analyzer, so a query word matches exactly the
//! terms the same word would have produced at indexing time. Words the
//! analyzer drops (stop words, short words) disappear from the query.
//!
//! # Examples
//!
//! ```
//! use quire::index::config::IndexConfig;
//! use quire::query::parser::{Clause, QueryParser};
//!
//! let config = IndexConfig::default().with_stop_words(["the"]);
//! let parser = QueryParser::new(&config);
//!
//! let query = parser.parse("The Cats OR dog*").unwrap();
//! assert_eq!(query.groups.len(), 2);
//! assert_eq!(query.groups[0].must, vec![Clause::Term("cats".into())]);
//! assert_eq!(query.groups[1].must, vec![Clause::Prefix("dog".into())]);
//! ```

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::Token as AnalyzedToken;
use crate::error::Result;
use crate::index::config::IndexConfig;
use crate::query::lexer::{Lexer, Token};

/// One term of a phrase with its offset from the phrase start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseTerm {
    pub term: String,
    pub offset: u32,
}

/// A matchable unit of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Exact term.
    Term(String),
    /// Any term starting with the given text.
    Prefix(String),
    /// Terms at fixed relative positions.
    Phrase(Vec<PhraseTerm>),
}

/// Clauses that must all match, minus clauses that must not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryGroup {
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
}

impl QueryGroup {
    fn push(&mut self, clause: Clause, negated: bool) {
        let target = if negated {
            &mut self.must_not
        } else {
            &mut self.must
        };
        if !target.contains(&clause) {
            target.push(clause);
        }
    }

    /// A group without positive clauses never matches.
    pub fn is_matchable(&self) -> bool {
        !self.must.is_empty()
    }
}

/// A parsed query: a document matches if any group matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub groups: Vec<QueryGroup>,
}

impl ParsedQuery {
    /// Check if no group can match anything.
    pub fn matches_nothing(&self) -> bool {
        !self.groups.iter().any(QueryGroup::is_matchable)
    }
}

/// Parser bound to the analysis settings of one index.
#[derive(Debug, Clone)]
pub struct QueryParser {
    analyzer: PipelineAnalyzer,
    prefix_analyzer: PipelineAnalyzer,
}

impl QueryParser {
    /// Create a parser normalizing words the way `config` indexes them.
    pub fn new(config: &IndexConfig) -> Self {
        QueryParser {
            analyzer: config.analyzer(),
            prefix_analyzer: config.prefix_analyzer(),
        }
    }

    /// Parse a query string.
    pub fn parse(&self, query: &str) -> Result<ParsedQuery> {
        let tokens = Lexer::new(query).tokenize()?;

        let mut groups = Vec::new();
        let mut current = QueryGroup::default();
        let mut negate_next = false;

        for token in tokens {
            match token {
                Token::Or => {
                    groups.push(std::mem::take(&mut current));
                    negate_next = false;
                }
                Token::Not => negate_next = true,
                Token::And | Token::LeftParen | Token::RightParen | Token::Eof => {}
                Token::Word { text, prefix } => {
                    let clauses = if prefix {
                        self.prefix_clauses(&text)?
                    } else {
                        self.text_clauses(&text)?
                    };
                    for clause in clauses {
                        current.push(clause, negate_next);
                    }
                    negate_next = false;
                }
                Token::Phrase(text) => {
                    for clause in self.text_clauses(&text)? {
                        current.push(clause, negate_next);
                    }
                    negate_next = false;
                }
            }
        }
        groups.push(current);

        Ok(ParsedQuery { groups })
    }

    /// Normalize a word or phrase: one token is a term, several are a phrase.
    fn text_clauses(&self, text: &str) -> Result<Vec<Clause>> {
        let tokens: Vec<AnalyzedToken> = self.analyzer.analyze(text)?.collect();
        Ok(match tokens.as_slice() {
            [] => Vec::new(),
            [single] => vec![Clause::Term(single.text.clone())],
            [first, ..] => {
                let base = first.position;
                vec![Clause::Phrase(
                    tokens
                        .iter()
                        .map(|t| PhraseTerm {
                            term: t.text.clone(),
                            offset: u32::try_from(t.position - base).unwrap_or(u32::MAX),
                        })
                        .collect(),
                )]
            }
        })
    }

    /// Normalize a prefix word; only its last piece is a prefix.
    fn prefix_clauses(&self, text: &str) -> Result<Vec<Clause>> {
        let mut pieces = self.prefix_analyzer.terms(text)?;
        let Some(last) = pieces.pop() else {
            return Ok(Vec::new());
        };
        let mut clauses: Vec<Clause> = pieces.into_iter().map(Clause::Term).collect();
        clauses.push(Clause::Prefix(last));
        Ok(clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(config: &IndexConfig, query: &str) -> ParsedQuery {
        QueryParser::new(config).parse(query).unwrap()
    }

    #[test]
    fn test_implicit_and() {
        let query = parse(&IndexConfig::default(), "Feeling thankyou");
        assert_eq!(query.groups.len(), 1);
        assert_eq!(
            query.groups[0].must,
            vec![Clause::Term("feeling".into()), Clause::Term("thankyou".into())]
        );
    }

    #[test]
    fn test_stop_words_vanish() {
        let config = IndexConfig::default().with_stop_words(["the"]);
        let query = parse(&config, "the");
        assert!(query.matches_nothing());

        let query = parse(&config, "the cat");
        assert_eq!(query.groups[0].must, vec![Clause::Term("cat".into())]);
    }

    #[test]
    fn test_min_length_applies_to_terms_not_prefixes() {
        let config = IndexConfig::default().with_min_term_length(4);
        let query = parse(&config, "owl pel*");
        assert_eq!(query.groups[0].must, vec![Clause::Prefix("pel".into())]);
    }

    #[test]
    fn test_negation() {
        let query = parse(&IndexConfig::default(), "cat -dog NOT fish");
        let group = &query.groups[0];
        assert_eq!(group.must, vec![Clause::Term("cat".into())]);
        assert_eq!(
            group.must_not,
            vec![Clause::Term("dog".into()), Clause::Term("fish".into())]
        );
    }

    #[test]
    fn test_only_negation_matches_nothing() {
        assert!(parse(&IndexConfig::default(), "-dog").matches_nothing());
    }

    #[test]
    fn test_phrase_keeps_stop_word_gaps() {
        let config = IndexConfig::default().with_stop_words(["the"]);
        let query = parse(&config, r#""feeling the blues""#);
        assert_eq!(
            query.groups[0].must,
            vec![Clause::Phrase(vec![
                PhraseTerm {
                    term: "feeling".into(),
                    offset: 0
                },
                PhraseTerm {
                    term: "blues".into(),
                    offset: 2
                },
            ])]
        );
    }

    #[test]
    fn test_hyphenated_word_becomes_phrase() {
        let query = parse(&IndexConfig::default(), "co-op");
        assert!(matches!(query.groups[0].must[0], Clause::Phrase(ref terms) if terms.len() == 2));
    }

    #[test]
    fn test_duplicate_clauses_collapse() {
        let query = parse(&IndexConfig::default(), "dog DOG dog");
        assert_eq!(query.groups[0].must.len(), 1);
    }

    #[test]
    fn test_or_groups() {
        let query = parse(&IndexConfig::default(), "a b | c");
        assert_eq!(query.groups.len(), 2);
        assert_eq!(query.groups[0].must.len(), 2);
        assert_eq!(query.groups[1].must, vec![Clause::Term("c".into())]);
    }
}
