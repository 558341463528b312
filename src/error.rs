//! Error types for Quire.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! is [`QuireError`]. Variants map onto the failure classes an index caller
//! has to distinguish: a missing path, an existing path on create, malformed
//! serialized bytes, a property write before the document was flushed, and a
//! mutation against a read-only or closed index.
//!
//! A search running out of time is not an error; it is reported through the
//! `more_available` flag of the search result instead.
//!
//! # Examples
//!
//! ```
//! use quire::error::{QuireError, Result};
//!
//! fn reject() -> Result<()> {
//!     Err(QuireError::invalid_argument("limit must be positive"))
//! }
//!
//! assert!(matches!(reject(), Err(QuireError::InvalidArgument(_))));
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Quire operations.
#[derive(Error, Debug)]
pub enum QuireError {
    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path or document that was required does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create was asked for a path that is already taken.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Serialized index bytes failed validation.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    /// The document has not been committed by a flush yet.
    #[error("Document not indexed yet: {0}")]
    NotIndexedYet(String),

    /// Mutation attempted on an index opened without write access.
    #[error("Index is read-only")]
    ReadOnly,

    /// The index has been closed.
    #[error("Index is closed")]
    Closed,

    /// Query parsing errors.
    #[error("Query error: {0}")]
    Query(String),

    /// Analysis errors (tokenization, filtering).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The operation is not available for this index or input.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Binary serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with QuireError.
pub type Result<T> = std::result::Result<T, QuireError>;

impl QuireError {
    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        QuireError::NotFound(msg.into())
    }

    /// Create a new already exists error.
    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        QuireError::AlreadyExists(msg.into())
    }

    /// Create a new corrupt data error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        QuireError::CorruptData(msg.into())
    }

    /// Create a new not-indexed-yet error.
    pub fn not_indexed_yet<S: Into<String>>(uri: S) -> Self {
        QuireError::NotIndexedYet(uri.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        QuireError::Query(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        QuireError::Analysis(msg.into())
    }

    /// Create a new unsupported operation error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        QuireError::Unsupported(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        QuireError::InvalidArgument(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        QuireError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        QuireError::Other(msg.into())
    }

    /// Whether the error came from validating serialized bytes.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, QuireError::CorruptData(_))
    }
}

impl From<bincode::Error> for QuireError {
    fn from(err: bincode::Error) -> Self {
        QuireError::Serialization(err.to_string())
    }
}
