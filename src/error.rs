//! Error types for tether.

use thiserror::Error;

/// Result type for tether operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tether operations.
///
/// Missing data (no candidates, no vector, no translation) is *not* an
/// error anywhere in this crate; those cases degrade to empty/zero signals.
/// Errors are reserved for malformed input the pipeline cannot safely
/// interpret.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parse error in an ingested document or annotation.
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource configuration error (designators, stop words, groups).
    #[error("Config error: {0}")]
    Config(String),

    /// Corpus operation error.
    #[error("Corpus error: {0}")]
    Corpus(String),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a corpus error.
    pub fn corpus(msg: impl Into<String>) -> Self {
        Error::Corpus(msg.into())
    }
}
