//! Index data structures: configuration, documents, postings.

pub mod config;
pub mod document;
pub mod inverted;
pub mod posting;
pub mod property;
