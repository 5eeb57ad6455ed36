//! Error types for the transient result store.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while writing or replaying a result log.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The stream is malformed or inconsistent. Never recoverable.
    #[error(
        "Problems loading the resolution results ({records_read} records read, last record: {}): {reason}",
        .last_record.unwrap_or("none")
    )]
    #[diagnostic(
        code(depot::results::corrupt),
        help("The result log is rebuilt on the next resolution; resolve the configuration again")
    )]
    Corrupt {
        /// Records decoded successfully before the failure.
        records_read: usize,
        /// Type of the last record decoded successfully.
        last_record: Option<&'static str>,
        /// What went wrong.
        reason: String,
    },

    /// An operation was called in the wrong store state.
    #[error("Cannot {operation}: the result store is {state}")]
    #[diagnostic(code(depot::results::state))]
    InvalidState {
        /// What was attempted.
        operation: &'static str,
        /// Current state.
        state: &'static str,
    },

    /// I/O failure on the backing file.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(depot::results::io))]
    Io {
        /// The underlying error.
        #[source]
        source: std::io::Error,
        /// What was being attempted.
        operation: &'static str,
    },
}

impl Error {
    /// Create an I/O error with context.
    #[must_use]
    pub const fn io(source: std::io::Error, operation: &'static str) -> Self {
        Self::Io { source, operation }
    }
}
