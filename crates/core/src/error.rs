//! Error types shared by the depot crates.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by core model operations.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A caller supplied data that can never be valid.
    #[error("{message}")]
    #[diagnostic(code(depot::core::invalid_user_data))]
    InvalidUserData {
        /// Description of the problem.
        message: String,
    },

    /// A dependency notation could not be converted.
    #[error("Cannot convert the provided notation to a module version selector: {notation}")]
    #[diagnostic(
        code(depot::core::invalid_notation),
        help(
            "The following types/formats are supported:\n  - String in the 'group:name:version' format, e.g. 'org.example:lib:1.0'\n  - Map with keys 'group', 'name' and 'version', e.g. [group: 'org.example', name: 'lib', version: '1.0']\n  - A module version selector instance\n  - Collections or arrays of the above"
        )
    )]
    InvalidNotation {
        /// Rendering of the rejected input.
        notation: String,
    },

    /// Two or more versions of a module were requested under strict conflict resolution.
    #[error("A conflict was found between the following modules:{}", format_candidates(.module, .versions))]
    #[diagnostic(
        code(depot::core::version_conflict),
        help("Force one of the versions or switch the conflict resolution to 'latest'")
    )]
    VersionConflict {
        /// `group:name` of the conflicting module.
        module: String,
        /// All requested versions, in request order.
        versions: Vec<String>,
    },

    /// Settings could not be read or parsed.
    #[error("Settings error in {}: {message}", path.display())]
    #[diagnostic(
        code(depot::core::settings),
        help("Check the settings file for syntax errors or unknown values")
    )]
    Settings {
        /// The settings file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A glob pattern in a file tree stage was malformed.
    #[error("Invalid pattern '{pattern}': {message}")]
    #[diagnostic(code(depot::core::pattern))]
    Pattern {
        /// The rejected pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// I/O failure.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(code(depot::core::io))]
    Io {
        /// The underlying error.
        #[source]
        source: std::io::Error,
        /// The path involved, if any.
        path: Option<PathBuf>,
        /// What was being attempted.
        operation: String,
    },
}

fn format_candidates(module: &str, versions: &[String]) -> String {
    versions
        .iter()
        .map(|v| format!("\n  - {module}:{v}"))
        .collect()
}

impl Error {
    /// Create an invalid user data error.
    #[must_use]
    pub fn invalid_user_data(message: impl Into<String>) -> Self {
        Self::InvalidUserData {
            message: message.into(),
        }
    }

    /// Create an invalid notation error.
    #[must_use]
    pub fn invalid_notation(notation: impl Into<String>) -> Self {
        Self::InvalidNotation {
            notation: notation.into(),
        }
    }

    /// Create a settings error.
    #[must_use]
    pub fn settings(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Settings {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path,
            operation: operation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_lists_every_candidate() {
        let err = Error::VersionConflict {
            module: "org:foo".to_string(),
            versions: vec!["1.0".to_string(), "2.0".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("org:foo:1.0"));
        assert!(msg.contains("org:foo:2.0"));
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = Error::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            Some(PathBuf::from("depot.toml")),
            "read",
        );
        assert!(err.to_string().contains("depot.toml"));
        assert!(err.to_string().contains("read"));
    }

    #[test]
    fn test_invalid_notation_names_input() {
        let err = Error::invalid_notation("42");
        assert!(err.to_string().contains("42"));
    }
}
