//! The error taxonomy shared by every operator in the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or draining a [`crate::graph::Graph`].
///
/// Every variant carries enough context to render a useful message without
/// consulting the call site; none of them are retried by the engine — an
/// error aborts the run at the point of the pull that produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// An [`crate::sources::InMemorySource`] was run without a binding for its name.
    #[error("no input bound for in-memory source {0:?}")]
    UnboundSource(String),

    /// A [`crate::sources::FileSource`] parser rejected a line.
    #[error("failed to parse line {line} of {path:?}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    /// An operator asked for a field the row does not have.
    #[error("row is missing field {0:?}")]
    MissingField(String),

    /// A field held a `Value` variant the operator cannot work with.
    #[error("field {field:?} has the wrong type: {message}")]
    TypeMismatch { field: String, message: String },

    /// `reduce` or `join` observed a key smaller than one already seen,
    /// meaning the upstream was not actually sorted by the declared keys.
    #[error("input not sorted by {keys:?}: key went backwards at row {index}")]
    OutOfOrder { keys: Vec<String>, index: usize },

    /// Spill-file or source-file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A caller-supplied mapper, predicate, or parser raised.
    #[error("user function failed: {0}")]
    UserFunction(String),
}
