//! Lexer for query strings.
//!
//! Words are separated by whitespace. Recognized syntax:
//!
//! - `"a b c"` phrase
//! - `word*` prefix
//! - `AND` / `&`, `OR` / `|`, `NOT` / leading `-` or `!`
//! - `(` and `)` are accepted and ignored

use crate::error::{QuireError, Result};

/// Token types for query string parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An unquoted word, with whether it ended in `*`
    Word { text: String, prefix: bool },
    /// A quoted phrase
    Phrase(String),
    /// AND operator
    And,
    /// OR operator
    Or,
    /// NOT operator
    Not,
    /// Left parenthesis
    LeftParen,
    /// Right parenthesis
    RightParen,
    /// End of input
    Eof,
}

/// Lexer for tokenizing query strings
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenize the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                return Ok(tokens);
            }
            tokens.push(token);
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char() else {
            return Ok(Token::Eof);
        };

        match ch {
            '"' => {
                self.advance();
                self.read_phrase()
            }
            '(' => {
                self.advance();
                Ok(Token::LeftParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RightParen)
            }
            '|' => {
                self.advance();
                Ok(Token::Or)
            }
            '&' => {
                self.advance();
                Ok(Token::And)
            }
            '-' | '!' => {
                self.advance();
                Ok(Token::Not)
            }
            _ => Ok(self.read_word()),
        }
    }

    fn read_phrase(&mut self) -> Result<Token> {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch == '"' {
                let phrase: String = self.input[start..self.position].iter().collect();
                self.advance();
                return Ok(Token::Phrase(phrase));
            }
            self.advance();
        }
        Err(QuireError::query(format!(
            "unterminated phrase starting at character {}",
            start.saturating_sub(1)
        )))
    }

    fn read_word(&mut self) -> Token {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() || matches!(ch, '"' | '(' | ')' | '|' | '&') {
                break;
            }
            self.advance();
        }
        let word: String = self.input[start..self.position].iter().collect();

        match word.as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            _ => {
                let text = word.trim_end_matches('*');
                Token::Word {
                    prefix: text.len() != word.len(),
                    text: text.to_string(),
                }
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }
}
