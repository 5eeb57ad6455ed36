//! Error types for configuration handling.

use crate::resolved::UnresolvedDependency;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configurations and their container.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A mutation was attempted after resolution.
    #[error("You can't change {configuration} which is not in unresolved state!")]
    #[diagnostic(
        code(depot::configurations::not_unresolved),
        help("Declare dependencies, artifacts and exclude rules before the configuration is resolved, or mutate a copy")
    )]
    NotUnresolved {
        /// Display name of the configuration.
        configuration: String,
    },

    /// `extends_from` would introduce a cycle.
    #[error("Cyclic extendsFrom from {configuration} and {other} is not allowed. See existing hierarchy: [{}]", .hierarchy.join(", "))]
    #[diagnostic(code(depot::configurations::cyclic_extends_from))]
    CyclicExtendsFrom {
        /// The configuration being extended.
        configuration: String,
        /// The rejected parent.
        other: String,
        /// Hierarchy of the rejected parent.
        hierarchy: Vec<String>,
    },

    /// A configuration with the same name already exists.
    #[error("Cannot add configuration '{name}' as a configuration with that name already exists")]
    #[diagnostic(code(depot::configurations::duplicate))]
    Duplicate {
        /// The duplicate name.
        name: String,
    },

    /// Resolution finished with unresolved dependencies and the caller asked for
    /// them to be rethrown.
    #[error("Could not resolve all dependencies for {configuration}.{}", format_failures(.failures))]
    #[diagnostic(
        code(depot::configurations::resolve),
        help("Inspect the listed paths to find which declaration pulls in the broken module")
    )]
    ResolveFailed {
        /// Display name of the configuration.
        configuration: String,
        /// Every unresolved dependency.
        failures: Vec<UnresolvedDependency>,
    },

    /// The resolver failed outright.
    #[error("Failed to resolve {configuration}: {source}")]
    #[diagnostic(code(depot::configurations::resolver))]
    Resolver {
        /// Display name of the configuration.
        configuration: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An artifact file could not be materialized.
    #[error("Could not download {artifact}: {source}")]
    #[diagnostic(code(depot::configurations::artifact))]
    ArtifactResolve {
        /// Artifact display name.
        artifact: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Core model error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] depot_core::Error),
}

fn format_failures(failures: &[UnresolvedDependency]) -> String {
    failures.iter().map(|f| format!("\n   > {f}")).collect()
}

impl Error {
    /// Create a not-unresolved error.
    #[must_use]
    pub fn not_unresolved(configuration: impl Into<String>) -> Self {
        Self::NotUnresolved {
            configuration: configuration.into(),
        }
    }

    /// Wrap a resolver failure.
    #[must_use]
    pub fn resolver(
        configuration: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Resolver {
            configuration: configuration.into(),
            source: source.into(),
        }
    }

    /// Wrap an artifact download failure.
    #[must_use]
    pub fn artifact(
        artifact: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ArtifactResolve {
            artifact: artifact.into(),
            source: source.into(),
        }
    }
}
