use thiserror::Error;

/// Custom Result type for NexaDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for NexaDB
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Lexer or parser failure, `position` is the 0-based offset in the input
    #[error("Expected {expected} but got {found} at position {position}")]
    Syntax {
        expected: String,
        found: String,
        position: usize,
    },

    /// Schema, type, or naming violation detected before any mutation
    #[error("{0}")]
    Validation(String),

    /// Missing table or database
    #[error("{0}")]
    NotFound(String),

    /// A non-comparison operator reached condition evaluation
    #[error("Unsupported operator: {0}")]
    Operator(String),

    /// Internal error (storage, serialization, etc.)
    #[error("internal error {0}")]
    Internal(String),
}

impl Error {
    pub fn syntax(expected: impl Into<String>, found: impl Into<String>, position: usize) -> Self {
        Error::Syntax {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }

    /// True for table or database absence
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(value: bincode::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(value: tempfile::PersistError) -> Self {
        Error::Internal(value.to_string())
    }
}
