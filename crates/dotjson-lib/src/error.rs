//! Common errors shared across the library.
//!
//! Get operations never raise &ndash; a path that fails to resolve produces a
//! [`Value`](crate::result::Value) whose kind is [`Kind::None`](crate::result::Kind::None).
//! The error types here are reserved for the operations with an explicit error
//! channel: path compilation, mutation and reformatting.
use thiserror::Error;

/// Error raised when a path expression cannot be parsed.
///
/// Carries the character offset into the path at which parsing failed,
/// which makes the error actionable for callers assembling paths dynamically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid path at character {offset}: {message}")]
pub struct PathSyntaxError {
    offset: usize,
    message: String,
}

impl PathSyntaxError {
    pub(crate) fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// Character offset into the path expression at which parsing failed.
    #[must_use]
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Short human-readable description of the failure.
    #[must_use]
    #[inline(always)]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error channel for mutation and formatting operations.
///
/// The input buffer is never modified when an error is returned; mutations
/// always either succeed with a freshly allocated output or fail cleanly.
#[derive(Error, Debug)]
pub enum Error {
    /// The input bytes are not a valid JSON document at a position the
    /// operation had to read. Carries the byte offset of the offending region.
    #[error("malformed JSON input at byte {0}")]
    MalformedInput(usize),

    /// The path expression could not be parsed, or uses a construct the
    /// operation does not accept (mutation paths must be plain key/index
    /// chains).
    #[error("path error: {0}")]
    PathSyntax(#[from] PathSyntaxError),

    /// The path demanded an index or key of a value that cannot provide it,
    /// e.g. indexing into a scalar.
    #[error("type mismatch: cannot apply segment `{segment}` to {found}")]
    TypeMismatch {
        /// The path segment that could not be applied.
        segment: String,
        /// What was found instead of a suitable container.
        found: &'static str,
    },

    /// A numeric index that cannot be materialised, e.g. a negative index
    /// other than `-1` on set, or deleting past the end of an array.
    #[error("index {0} out of range")]
    OutOfRange(i64),

    /// A supplied native value cannot be encoded as JSON,
    /// e.g. a non-finite floating point number.
    #[error("value cannot be encoded: {0}")]
    EncodingFailure(&'static str),

    /// Failure of one operation inside a `set_many`/`delete_many` batch,
    /// identified by its zero-based position.
    #[error("operation {index} in batch failed: {source}")]
    Batch {
        /// Zero-based index of the failing operation.
        index: usize,
        /// The underlying failure.
        source: Box<Error>,
    },

    /// Invariant violation inside the engine. Should be unreachable;
    /// if you encounter this error, you may report it as a bug.
    #[error("internal invariant violated")]
    InternalInvariant,
}

impl Error {
    pub(crate) fn in_batch(self, index: usize) -> Self {
        Self::Batch {
            index,
            source: Box::new(self),
        }
    }
}
