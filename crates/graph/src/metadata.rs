//! External module metadata and the source that provides it.

use crate::error::ModuleVersionResolveError;
use depot_core::{
    ArtifactName, DEFAULT_CONFIGURATION, ExcludeRule, ModuleDependency, ModuleVersionIdentifier,
    ModuleVersionSelector,
};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::sync::Arc;

/// A configuration declared by an external module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationMetadata {
    /// Configurations of the same module this one extends.
    pub extends_from: Vec<String>,
    /// Whether dependencies reached through this configuration are followed.
    pub transitive: bool,
    /// Whether the configuration may be targeted from outside the module.
    pub visible: bool,
    /// Dependencies declared directly in this configuration.
    pub dependencies: Vec<ModuleDependency>,
    /// Artifacts published in this configuration.
    pub artifacts: Vec<ArtifactName>,
    /// Modules excluded below this configuration.
    pub excludes: Vec<ExcludeRule>,
}

impl Default for ConfigurationMetadata {
    fn default() -> Self {
        Self {
            extends_from: Vec::new(),
            transitive: true,
            visible: true,
            dependencies: Vec::new(),
            artifacts: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

/// Everything the graph builder needs to know about one module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMetadata {
    id: ModuleVersionIdentifier,
    configurations: IndexMap<String, ConfigurationMetadata>,
}

impl ModuleMetadata {
    /// Metadata for a module without a descriptor: a single `default`
    /// configuration publishing `<name>.jar`.
    #[must_use]
    pub fn new(id: ModuleVersionIdentifier) -> Self {
        let jar = ArtifactName::new(&id.name, "jar", None);
        let mut configurations = IndexMap::new();
        configurations.insert(
            DEFAULT_CONFIGURATION.to_string(),
            ConfigurationMetadata {
                artifacts: vec![jar],
                ..ConfigurationMetadata::default()
            },
        );
        Self { id, configurations }
    }

    /// Metadata with no configurations at all.
    #[must_use]
    pub fn empty(id: ModuleVersionIdentifier) -> Self {
        Self {
            id,
            configurations: IndexMap::new(),
        }
    }

    /// Declare or replace a configuration.
    #[must_use]
    pub fn with_configuration(
        mut self,
        name: impl Into<String>,
        configuration: ConfigurationMetadata,
    ) -> Self {
        self.configurations.insert(name.into(), configuration);
        self
    }

    /// Add a dependency to `configuration`, declaring it if needed.
    #[must_use]
    pub fn with_dependency(mut self, configuration: &str, dependency: ModuleDependency) -> Self {
        self.configuration_mut(configuration)
            .dependencies
            .push(dependency);
        self
    }

    /// Add an artifact to `configuration`, declaring it if needed.
    #[must_use]
    pub fn with_artifact(mut self, configuration: &str, artifact: ArtifactName) -> Self {
        self.configuration_mut(configuration).artifacts.push(artifact);
        self
    }

    fn configuration_mut(&mut self, name: &str) -> &mut ConfigurationMetadata {
        self.configurations.entry(name.to_string()).or_default()
    }

    /// The module version.
    #[must_use]
    pub const fn id(&self) -> &ModuleVersionIdentifier {
        &self.id
    }

    /// Look up a configuration.
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&ConfigurationMetadata> {
        self.configurations.get(name)
    }

    /// Names of the declared configurations.
    pub fn configuration_names(&self) -> impl Iterator<Item = &str> {
        self.configurations.keys().map(String::as_str)
    }

    /// `name` followed by every configuration it extends, each once.
    /// Unknown parents are skipped.
    #[must_use]
    pub fn hierarchy(&self, name: &str) -> Vec<&str> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut stack = vec![name];
        while let Some(current) = stack.pop() {
            let Some((key, configuration)) = self.configurations.get_key_value(current) else {
                continue;
            };
            if !seen.insert(key.as_str()) {
                continue;
            }
            stack.extend(configuration.extends_from.iter().rev().map(String::as_str));
        }
        seen.into_iter().collect()
    }

    fn across_hierarchy<'a, T: 'a>(
        &'a self,
        name: &str,
        select: impl Fn(&'a ConfigurationMetadata) -> &'a [T],
    ) -> impl Iterator<Item = &'a T> {
        self.hierarchy(name)
            .into_iter()
            .filter_map(|c| self.configurations.get(c))
            .flat_map(select)
    }

    /// Dependencies of `name` and everything it extends.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&ModuleDependency> {
        self.across_hierarchy(name, |c| c.dependencies.as_slice()).collect()
    }

    /// Artifacts of `name` and everything it extends, without duplicates.
    #[must_use]
    pub fn artifacts(&self, name: &str) -> Vec<ArtifactName> {
        let unique: IndexSet<&ArtifactName> =
            self.across_hierarchy(name, |c| c.artifacts.as_slice()).collect();
        unique.into_iter().cloned().collect()
    }

    /// Exclude rules of `name` and everything it extends.
    #[must_use]
    pub fn excludes(&self, name: &str) -> Vec<&ExcludeRule> {
        self.across_hierarchy(name, |c| c.excludes.as_slice()).collect()
    }

    /// Whether dependencies reached through `name` are followed.
    #[must_use]
    pub fn is_transitive(&self, name: &str) -> bool {
        self.configurations.get(name).is_none_or(|c| c.transitive)
    }
}

/// Finds module metadata, usually by asking repositories.
pub trait ModuleMetadataSource: Send + Sync {
    /// Metadata for exactly the version named by `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleVersionResolveError::NotFound`] when no repository has
    /// the module, or another variant when the metadata is unusable.
    fn resolve(
        &self,
        selector: &ModuleVersionSelector,
    ) -> Result<Arc<ModuleMetadata>, ModuleVersionResolveError>;
}

/// A metadata source holding modules in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryModuleSource {
    modules: HashMap<ModuleVersionIdentifier, Arc<ModuleMetadata>>,
}

impl InMemoryModuleSource {
    /// An empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module version, replacing any earlier registration.
    pub fn add(&mut self, metadata: ModuleMetadata) -> &mut Self {
        self.modules
            .insert(metadata.id().clone(), Arc::new(metadata));
        self
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with_module(mut self, metadata: ModuleMetadata) -> Self {
        self.add(metadata);
        self
    }

    /// Number of registered module versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleMetadataSource for InMemoryModuleSource {
    fn resolve(
        &self,
        selector: &ModuleVersionSelector,
    ) -> Result<Arc<ModuleMetadata>, ModuleVersionResolveError> {
        self.modules
            .get(&selector.to_identifier())
            .cloned()
            .ok_or_else(|| ModuleVersionResolveError::not_found(selector.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ModuleVersionIdentifier {
        ModuleVersionIdentifier::new("org", "lib", "1.0")
    }

    #[test]
    fn test_default_metadata_publishes_jar() {
        let metadata = ModuleMetadata::new(id());
        assert_eq!(metadata.artifacts("default"), vec![ArtifactName::new("lib", "jar", None)]);
        assert!(metadata.is_transitive("default"));
        assert!(metadata.dependencies("default").is_empty());
    }

    #[test]
    fn test_hierarchy_collects_parents_once() {
        let metadata = ModuleMetadata::empty(id())
            .with_configuration("compile", ConfigurationMetadata::default())
            .with_configuration(
                "runtime",
                ConfigurationMetadata {
                    extends_from: vec!["compile".into()],
                    ..ConfigurationMetadata::default()
                },
            )
            .with_configuration(
                "default",
                ConfigurationMetadata {
                    extends_from: vec!["runtime".into(), "compile".into(), "missing".into()],
                    ..ConfigurationMetadata::default()
                },
            );

        assert_eq!(metadata.hierarchy("default"), vec!["default", "runtime", "compile"]);
        assert_eq!(metadata.hierarchy("compile"), vec!["compile"]);
        assert!(metadata.hierarchy("missing").is_empty());
    }

    #[test]
    fn test_dependencies_and_artifacts_span_hierarchy() {
        let metadata = ModuleMetadata::empty(id())
            .with_dependency("compile", ModuleDependency::new("org", "a", "1.0"))
            .with_artifact("compile", ArtifactName::new("lib", "jar", None))
            .with_configuration(
                "runtime",
                ConfigurationMetadata {
                    extends_from: vec!["compile".into()],
                    dependencies: vec![ModuleDependency::new("org", "b", "1.0")],
                    artifacts: vec![ArtifactName::new("lib", "jar", None)],
                    ..ConfigurationMetadata::default()
                },
            );

        let names: Vec<String> = metadata
            .dependencies("runtime")
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(metadata.artifacts("runtime").len(), 1);
    }

    #[test]
    fn test_in_memory_source() {
        let source = InMemoryModuleSource::new().with_module(ModuleMetadata::new(id()));
        assert_eq!(source.len(), 1);
        assert!(source.resolve(&ModuleVersionSelector::new("org", "lib", "1.0")).is_ok());

        let err = source
            .resolve(&ModuleVersionSelector::new("org", "lib", "2.0"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Module org:lib:2.0 not found");
    }
}
