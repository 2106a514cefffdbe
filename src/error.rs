//! Centralized error handling for Scribe.
//!
//! Every failure in the engine is surfaced through [`ScribeError`]; nothing in the
//! library panics on malformed input. Errors fall into five groups:
//!
//! - **Malformed schema** ([`ScribeError::Schema`], [`ScribeError::UndefinedType`]): raised
//!   while type names are parsed. A reader whose schema fails to parse is never returned.
//! - **Navigation** ([`ScribeError::OutOfBounds`], [`ScribeError::KeyNotFound`]): local to a
//!   single lookup. The reader is untouched and the lookup can be retried with another key.
//! - **Type mismatch** ([`ScribeError::TypeMismatch`]): `safe_cast` against the wrong codec
//!   name, or a union-only operation on a non-union node.
//! - **Resources** ([`ScribeError::Io`], [`ScribeError::Json`], [`ScribeError::Format`]): file
//!   access, header text, and truncated or corrupted bodies.
//! - **Writer state** ([`ScribeError::InvalidState`]): writing after close, closing twice.
//!
//! There is no automatic retry anywhere in the crate.
//!
//! ## Example
//!
//! ```rust
//! use scribe::{Scribe, ScribeError};
//!
//! match Scribe::open("does-not-exist.scribe") {
//!     Err(ScribeError::Io(e)) => eprintln!("cannot open: {e}"),
//!     Err(e) => eprintln!("other error: {e}"),
//!     Ok(_) => unreachable!(),
//! }
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Scribe operations.
pub type Result<T> = std::result::Result<T, ScribeError>;

/// The error enum covering every failure domain of the engine.
///
/// The type is `Clone`; I/O errors are wrapped in an `Arc` to make that cheap.
#[derive(Debug, Clone)]
pub enum ScribeError {
    /// Opening, mapping, reading or writing a file failed.
    Io(Arc<io::Error>),

    /// The header text is not valid JSON, or could not be produced.
    Json(String),

    /// The file does not follow the on-disk layout.
    ///
    /// Raised for a header whose braces never balance, a body shorter than the
    /// schema requires, a union discriminant with no matching alternative, or a
    /// sequence too long for its 32-bit count prefix.
    Format(String),

    /// A type name or type definition is malformed.
    Schema(String),

    /// A user-defined type name has no entry in the type dictionary.
    UndefinedType(String),

    /// An index is not smaller than the size of the node it was applied to.
    OutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of elements or fields actually present.
        size: usize,
    },

    /// A named field lookup found no child with that name.
    KeyNotFound(String),

    /// The stored type does not match the one the caller asked for.
    TypeMismatch {
        /// What the operation needed.
        expected: String,
        /// The type name recorded in the schema.
        found: String,
    },

    /// The writer was used after it had been closed.
    InvalidState(String),
}

impl fmt::Display for ScribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Json(s) => write!(f, "Header Error: {s}"),
            Self::Format(s) => write!(f, "Format Error: {s}"),
            Self::Schema(s) => write!(f, "Schema Error: {s}"),
            Self::UndefinedType(name) => write!(f, "Schema Error: no definition for type `{name}`"),
            Self::OutOfBounds { index, size } => {
                write!(f, "Index Error: index {index} out of bounds for size {size}")
            }
            Self::KeyNotFound(key) => write!(f, "Index Error: key `{key}` not found"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type Error: cannot cast {found} to {expected}")
            }
            Self::InvalidState(s) => write!(f, "State Error: {s}"),
        }
    }
}

impl std::error::Error for ScribeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ScribeError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
