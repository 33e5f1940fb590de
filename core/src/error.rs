//! Error types for EDM schema operations

use thiserror::Error;

use crate::ids::ItemKind;

/// Main error type for schema graph operations
#[derive(Error, Debug)]
pub enum EdmError {
    /// A structural invariant of the graph would be broken
    #[error("Invariant violation: {message}")]
    InvariantViolation {
        /// Error message
        message: String,
    },

    /// A required argument was missing or malformed
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// The item does not support the requested operation
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// An id was used against an arena that does not own it
    #[error("Unknown {kind} '{id}'")]
    UnknownItem {
        /// Kind of the item that was looked up
        kind: ItemKind,
        /// Display form of the id
        id: String,
    },

    /// A derived view needed a link that is still a name-only placeholder
    #[error("Unresolved {kind} reference '{name}'")]
    UnresolvedReference {
        /// Kind of the referenced item
        kind: ItemKind,
        /// Name carried by the placeholder
        name: String,
    },

    /// A short-name lookup matched more than one item
    #[error("Ambiguous {kind} name '{name}': candidates {candidates:?}")]
    AmbiguousName {
        /// Kind of the looked-up item
        kind: ItemKind,
        /// Name that was looked up
        name: String,
        /// Full names of every match
        candidates: Vec<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for schema graph operations
pub type Result<T> = std::result::Result<T, EdmError>;

impl EdmError {
    /// Create a new invariant violation
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create a new invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not supported error
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported(operation.into())
    }

    /// Create an unknown item error
    #[must_use]
    pub fn unknown_item(kind: ItemKind, id: impl ToString) -> Self {
        Self::UnknownItem {
            kind,
            id: id.to_string(),
        }
    }

    /// Create an unresolved reference error
    #[must_use]
    pub fn unresolved(kind: ItemKind, name: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            kind,
            name: name.into(),
        }
    }

    /// Create an ambiguous name error
    #[must_use]
    pub fn ambiguous(kind: ItemKind, name: impl Into<String>, candidates: Vec<String>) -> Self {
        Self::AmbiguousName {
            kind,
            name: name.into(),
            candidates,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true for the invariant-violation family of errors
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

impl From<serde_json::Error> for EdmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for EdmError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Return the only element of `items`, failing unless there is exactly one
///
/// # Errors
///
/// Returns an invariant violation naming `what` when zero or several
/// elements remain.
pub fn expect_single<T, I>(items: I, what: impl FnOnce() -> String) -> Result<T>
where
    I: IntoIterator<Item = T>,
{
    let mut iter = items.into_iter();
    match (iter.next(), iter.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(EdmError::invariant(format!("expected exactly one {}, found none", what()))),
        (Some(_), Some(_)) => Err(EdmError::invariant(format!(
            "expected exactly one {}, found {}",
            what(),
            2 + iter.count()
        ))),
    }
}
