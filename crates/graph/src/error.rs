//! Error types for graph resolution.

use depot_core::{ModuleVersionIdentifier, ModuleVersionSelector};
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single requested module could not become a graph node.
///
/// These never abort a resolution. They are attached to the requesting edges
/// and surface through `UnresolvedDependency`.
#[derive(Error, Debug, Diagnostic)]
pub enum ModuleVersionResolveError {
    /// No repository knows the module version.
    #[error("Module {selector} not found")]
    #[diagnostic(
        code(depot::graph::not_found),
        help("Check the coordinates and the repositories the module is expected in")
    )]
    NotFound {
        /// The selector that was looked up.
        selector: ModuleVersionSelector,
    },

    /// The module exists but does not declare the requested configuration.
    #[error("Module {module} has no configuration '{configuration}'")]
    #[diagnostic(code(depot::graph::configuration_not_found))]
    ConfigurationNotFound {
        /// The resolved module.
        module: ModuleVersionIdentifier,
        /// The configuration asked for.
        configuration: String,
    },

    /// Strict conflict resolution rejected the module.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Conflict(#[from] depot_core::Error),

    /// Metadata was found but could not be read.
    #[error("Could not read metadata for {selector}: {message}")]
    #[diagnostic(code(depot::graph::metadata))]
    Metadata {
        /// The selector that was looked up.
        selector: ModuleVersionSelector,
        /// Description of the problem.
        message: String,
    },
}

impl ModuleVersionResolveError {
    /// Create a not-found error.
    #[must_use]
    pub const fn not_found(selector: ModuleVersionSelector) -> Self {
        Self::NotFound { selector }
    }

    /// Create a metadata error.
    #[must_use]
    pub fn metadata(selector: ModuleVersionSelector, message: impl Into<String>) -> Self {
        Self::Metadata {
            selector,
            message: message.into(),
        }
    }
}

/// Errors that stop a resolution outright.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The result log could not be written.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Results(#[from] depot_results::Error),

    /// A configuration operation failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configurations(#[from] depot_configurations::Error),
}
