//! Named configurations of one project.

use crate::configuration::Configuration;
use crate::error::{Error, Result};
use crate::resolved::ConfigurationResolver;
use depot_core::{ConflictResolution, ModuleDependency, ModuleVersionIdentifier, ResolutionStrategy};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Creates and looks up the configurations of a project.
pub struct ConfigurationContainer {
    project_path: String,
    module: ModuleVersionIdentifier,
    resolver: Arc<dyn ConfigurationResolver>,
    conflict_resolution: ConflictResolution,
    configurations: RwLock<IndexMap<String, Configuration>>,
    detached: AtomicUsize,
}

impl ConfigurationContainer {
    /// Container for the project at `project_path` (`:` for the root project).
    #[must_use]
    pub fn new(
        project_path: impl Into<String>,
        module: ModuleVersionIdentifier,
        resolver: Arc<dyn ConfigurationResolver>,
    ) -> Self {
        Self {
            project_path: project_path.into(),
            module,
            resolver,
            conflict_resolution: ConflictResolution::default(),
            configurations: RwLock::new(IndexMap::new()),
            detached: AtomicUsize::new(0),
        }
    }

    /// Conflict policy given to configurations created from now on.
    #[must_use]
    pub const fn with_conflict_resolution(mut self, policy: ConflictResolution) -> Self {
        self.conflict_resolution = policy;
        self
    }

    fn path_of(&self, name: &str) -> String {
        if self.project_path == ":" {
            format!(":{name}")
        } else {
            format!("{}:{name}", self.project_path)
        }
    }

    fn build(&self, name: &str) -> Configuration {
        Configuration::new(
            name,
            self.path_of(name),
            self.module.clone(),
            Arc::clone(&self.resolver),
            ResolutionStrategy::new(self.conflict_resolution),
        )
    }

    /// Create and register a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if the name is taken.
    pub fn create(&self, name: &str) -> Result<Configuration> {
        let mut configurations = self.configurations.write();
        if configurations.contains_key(name) {
            return Err(Error::Duplicate {
                name: name.to_string(),
            });
        }
        let configuration = self.build(name);
        configurations.insert(name.to_string(), configuration.clone());
        debug!(path = %configuration.path(), "Created configuration");
        Ok(configuration)
    }

    /// Look up a configuration by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Configuration> {
        self.configurations.read().get(name).cloned()
    }

    /// Every registered configuration in creation order.
    #[must_use]
    pub fn configurations(&self) -> Vec<Configuration> {
        self.configurations.read().values().cloned().collect()
    }

    /// A configuration holding `dependencies` that is not registered in the
    /// container.
    ///
    /// # Errors
    ///
    /// Never fails for a fresh configuration; the signature mirrors
    /// [`Configuration::add_dependency`].
    pub fn detached_configuration(
        &self,
        dependencies: impl IntoIterator<Item = ModuleDependency>,
    ) -> Result<Configuration> {
        let index = self.detached.fetch_add(1, Ordering::SeqCst) + 1;
        let configuration = self.build(&format!("detachedConfiguration{index}"));
        for dependency in dependencies {
            configuration.add_dependency(dependency)?;
        }
        Ok(configuration)
    }
}
