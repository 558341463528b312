//! Query parsing, matching and scoring.

pub mod collector;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod scoring;
