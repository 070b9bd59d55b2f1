//! Error types for querylite.

use crate::jpql::ParseError;
use crate::value::ValueType;
use thiserror::Error as ThisError;

/// The main error type for querylite operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Schema lookup for a type or name that was never registered
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Malformed builder or schema input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A single-valued clause was set twice on the same builder
    #[error("duplicate {0} clause")]
    DuplicateClause(&'static str),

    /// More than one row matched where at most one was expected
    #[error("expected at most one {entity} row, found more")]
    NonUniqueResult {
        /// Queried entity
        entity: String,
    },

    /// No row matched where exactly one was expected
    #[error("expected exactly one {entity} row, found none")]
    NoResult {
        /// Queried entity
        entity: String,
    },

    /// A stored value could not be converted into the requested Rust type
    #[error("cannot map column {column}: expected {expected}, found {found}")]
    Mapping {
        /// Column being read
        column: String,
        /// Type the field declares
        expected: ValueType,
        /// Type name of the stored value
        found: String,
    },

    /// A string query referenced a parameter that was never bound
    #[error("unbound parameter :{0}")]
    UnboundParameter(String),

    /// String query syntax error
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Failure reported by the store collaborator, passed through unmodified
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps a store-side failure without altering it.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store(Box::new(err))
    }

    pub(crate) fn mapping(column: &str, expected: ValueType, found: &crate::Value) -> Self {
        Error::Mapping {
            column: column.to_string(),
            expected,
            found: found.type_name().to_string(),
        }
    }
}

/// A specialized `Result` type for querylite operations.
pub type Result<T> = std::result::Result<T, Error>;
