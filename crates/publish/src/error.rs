//! Error types for publishing.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for publish operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A single failed transfer. Transport errors are retried; only the last one
/// reaches callers, wrapped in [`Error::Network`].
#[derive(Error, Debug, Diagnostic)]
pub enum TransportError {
    /// Local file system failure.
    #[error("{0}")]
    #[diagnostic(code(depot::publish::transport_io))]
    Io(#[from] std::io::Error),

    /// The server answered with a non-success status.
    #[error("Received status code {status} from server")]
    #[diagnostic(code(depot::publish::http_status))]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be sent.
    #[error("{message}")]
    #[diagnostic(code(depot::publish::request))]
    Request {
        /// Client message.
        message: String,
    },
}

/// Errors raised while publishing.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The publication is not valid. Raised before any network I/O.
    #[error("Invalid publication '{publication}': {message}")]
    #[diagnostic(
        code(depot::publish::invalid_publication),
        help("Fix the publication coordinates or artifacts and publish again")
    )]
    InvalidPublication {
        /// Publication name.
        publication: String,
        /// Every error problem, one per line.
        message: String,
    },

    /// A transfer failed after every retry.
    #[error("Could not {operation}")]
    #[diagnostic(
        code(depot::publish::network),
        help("Check the repository URL, credentials and network connectivity")
    )]
    Network {
        /// `GET <resource>` or `PUT <resource>`.
        operation: String,
        /// Last failure.
        #[source]
        source: TransportError,
    },

    /// Repository metadata could not be read or written.
    #[error("Invalid repository metadata at {resource}: {message}")]
    #[diagnostic(code(depot::publish::metadata))]
    Metadata {
        /// Resource path within the repository.
        resource: String,
        /// Parser message.
        message: String,
    },

    /// A local file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(depot::publish::io))]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A publish job panicked. Only its own submission fails.
    #[error("Publish job panicked: {message}")]
    #[diagnostic(code(depot::publish::job_panicked))]
    JobPanicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The publish queue worker is gone.
    #[error("Publish queue is closed")]
    #[diagnostic(code(depot::publish::queue_closed))]
    QueueClosed,
}

impl Error {
    /// Create an invalid publication error.
    #[must_use]
    pub fn invalid_publication(publication: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPublication {
            publication: publication.into(),
            message: message.into(),
        }
    }

    /// Create a network error for `operation`.
    #[must_use]
    pub fn network(operation: impl Into<String>, source: TransportError) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    /// Create a metadata error.
    #[must_use]
    pub fn metadata(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Metadata {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl TransportError {
    /// Create a request error.
    #[must_use]
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }
}
