//! The resolver seam and the result it produces.

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use depot_core::{ModuleDependency, ModuleVersionIdentifier, ModuleVersionSelector};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Turns a configuration into a resolved result.
///
/// Called at most once per configuration, while the configuration's resolution
/// lock is held. Implementations must not resolve the same configuration again
/// from inside [`ConfigurationResolver::resolve`].
pub trait ConfigurationResolver: Send + Sync {
    /// Resolve `configuration`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that prevent producing any result.
    /// Unresolvable dependencies belong in the returned result instead.
    fn resolve(&self, configuration: &Configuration) -> Result<Arc<dyn ResolvedConfiguration>>;
}

/// Outcome of resolving a configuration.
pub trait ResolvedConfiguration: Send + Sync + fmt::Debug {
    /// Display name of the configuration this result belongs to.
    fn configuration(&self) -> &str;

    /// Dependencies that could not be resolved.
    fn unresolved_dependencies(&self) -> Vec<UnresolvedDependency>;

    /// Modules directly requested by the first-level dependencies accepted by
    /// `spec`.
    fn first_level_modules(
        &self,
        spec: &dyn Fn(&ModuleDependency) -> bool,
    ) -> Vec<ModuleVersionIdentifier>;

    /// Artifact files reachable from the first-level dependencies accepted by
    /// `spec`, downloading them if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if an artifact file cannot be materialized.
    fn files(&self, spec: &dyn Fn(&ModuleDependency) -> bool) -> Result<Vec<PathBuf>>;

    /// Whether any dependency failed to resolve.
    fn has_error(&self) -> bool {
        !self.unresolved_dependencies().is_empty()
    }

    /// Fail with every unresolved dependency when there is at least one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolveFailed`] when the result has errors.
    fn rethrow_failure(&self) -> Result<()> {
        let failures = self.unresolved_dependencies();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ResolveFailed {
                configuration: self.configuration().to_string(),
                failures,
            })
        }
    }
}

/// A requested module that could not be resolved, with every path that
/// requested it.
#[derive(Debug, Clone)]
pub struct UnresolvedDependency {
    selector: ModuleVersionSelector,
    problem: Arc<dyn std::error::Error + Send + Sync>,
    paths: Vec<Vec<ModuleVersionIdentifier>>,
}

impl UnresolvedDependency {
    /// Create an unresolved dependency.
    ///
    /// Each path runs from the root module to the module that declared the
    /// broken dependency.
    #[must_use]
    pub fn new(
        selector: ModuleVersionSelector,
        problem: Arc<dyn std::error::Error + Send + Sync>,
        paths: Vec<Vec<ModuleVersionIdentifier>>,
    ) -> Self {
        Self {
            selector,
            problem,
            paths,
        }
    }

    /// The requested module version.
    #[must_use]
    pub const fn selector(&self) -> &ModuleVersionSelector {
        &self.selector
    }

    /// Why resolution failed.
    #[must_use]
    pub fn problem(&self) -> &(dyn std::error::Error + Send + Sync) {
        self.problem.as_ref()
    }

    /// Paths from the root to every requester.
    #[must_use]
    pub fn paths(&self) -> &[Vec<ModuleVersionIdentifier>] {
        &self.paths
    }
}

impl fmt::Display for UnresolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Could not resolve {}.", self.selector)?;
        if !self.paths.is_empty() {
            f.write_str("\n     Required by:")?;
            for path in &self.paths {
                let rendered: Vec<String> = path.iter().map(ToString::to_string).collect();
                write!(f, "\n         {}", rendered.join(" > "))?;
            }
        }
        write!(f, "\n      > {}", self.problem)
    }
}

impl std::error::Error for UnresolvedDependency {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.problem.as_ref())
    }
}
