//! Error type for muscade operations
//!
//! Only structural problems (bad template authoring, missing source) become
//! [`Error`] values. Data-level problems — missing keys, wrong value types,
//! non-boolean condition strings — are recoverable by design and are rendered
//! as inline diagnostic text instead (see the renderer).

/// Error type for muscade operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A directive has the wrong number of arguments
    #[error("directive {{{{{body}}}}} is not correct, check spacing")]
    Directive { body: String },

    /// Unrecognized directive command keyword
    #[error("unrecognized command {{{{{body}}}}}")]
    UnknownDirective { body: String },

    /// An IF/IF_NOT chunk has no matching END_IF before the sequence ends
    #[error("IF '{name}' has no matching END_IF")]
    UnmatchedIf { name: String },

    /// A LOOP chunk has no matching END_LOOP before the sequence ends
    #[error("LOOP '{name}' has no matching END_LOOP")]
    UnmatchedLoop { name: String },

    /// Template source text could not be fetched
    #[error("cannot load template '{name}': {message}")]
    Load { name: String, message: String },
}

/// Result type alias for muscade operations.
pub type Result<T> = std::result::Result<T, Error>;
