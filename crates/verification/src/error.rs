//! Error types for dependency verification.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for verification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Raised when artifacts fail verification.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// At least one artifact failed verification. The rendered report is the
    /// message.
    #[error("{report}")]
    #[diagnostic(
        code(depot::verification::failed),
        help("Review the verification metadata file before trusting new artifacts")
    )]
    Failed {
        /// What was being verified, e.g. `configuration ':compile'`.
        subject: String,
        /// Number of artifacts that failed.
        artifacts: usize,
        /// Rendered console report.
        report: String,
    },
}
