//! Configurations: named, extensible sets of dependencies and artifacts.
//!
//! A [`Configuration`] is a cheap handle; clones share the same underlying
//! configuration and compare equal by identity. Every mutator fails once the
//! configuration has been resolved.

use crate::error::{Error, Result};
use crate::files::ArtifactFileCollection;
use crate::resolved::{ConfigurationResolver, ResolvedConfiguration};
use depot_core::{ExcludeRule, ModuleDependency, ModuleVersionIdentifier, ResolutionStrategy};
use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Resolution state of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not yet resolved; mutable.
    Unresolved,
    /// Resolved without failures.
    Resolved,
    /// Resolved, with at least one unresolved dependency.
    ResolvedWithFailures,
}

/// An artifact produced by the owning project and published through a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishArtifact {
    /// Base name.
    pub name: String,
    /// File extension.
    pub extension: String,
    /// Optional classifier.
    pub classifier: Option<String>,
    /// Location of the file once built.
    pub file: PathBuf,
    /// Tasks that build the file.
    pub build_dependencies: Vec<String>,
}

impl PublishArtifact {
    /// Create an artifact with no build dependencies.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        classifier: Option<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            classifier,
            file: file.into(),
            build_dependencies: Vec::new(),
        }
    }

    /// Declare a task that builds this artifact.
    #[must_use]
    pub fn built_by(mut self, task: impl Into<String>) -> Self {
        self.build_dependencies.push(task.into());
        self
    }
}

// Serializes every extends_from change so the cycle check and the insert
// see the same graph.
static HIERARCHY_LOCK: Mutex<()> = parking_lot::const_mutex(());

type BeforeResolve = Arc<dyn Fn(&Configuration) + Send + Sync>;
type AfterResolve = Arc<dyn Fn(&Configuration, &dyn ResolvedConfiguration) + Send + Sync>;

struct Data {
    state: State,
    visible: bool,
    transitive: bool,
    description: Option<String>,
    extends_from: Vec<Configuration>,
    dependencies: IndexSet<ModuleDependency>,
    artifacts: IndexSet<PublishArtifact>,
    exclude_rules: IndexSet<ExcludeRule>,
    resolution_strategy: ResolutionStrategy,
}

#[derive(Default)]
struct Listeners {
    before: Vec<BeforeResolve>,
    after: Vec<AfterResolve>,
}

struct Inner {
    name: String,
    path: String,
    module: ModuleVersionIdentifier,
    resolver: Arc<dyn ConfigurationResolver>,
    data: RwLock<Data>,
    listeners: Mutex<Listeners>,
    // Held for the whole resolve-and-cache sequence.
    resolution: Mutex<Option<Arc<dyn ResolvedConfiguration>>>,
}

/// Handle to a configuration.
#[derive(Clone)]
pub struct Configuration {
    inner: Arc<Inner>,
}

impl Configuration {
    /// Create an unresolved, visible, transitive configuration.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        module: ModuleVersionIdentifier,
        resolver: Arc<dyn ConfigurationResolver>,
        resolution_strategy: ResolutionStrategy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                path: path.into(),
                module,
                resolver,
                data: RwLock::new(Data {
                    state: State::Unresolved,
                    visible: true,
                    transitive: true,
                    description: None,
                    extends_from: Vec::new(),
                    dependencies: IndexSet::new(),
                    artifacts: IndexSet::new(),
                    exclude_rules: IndexSet::new(),
                    resolution_strategy,
                }),
                listeners: Mutex::new(Listeners::default()),
                resolution: Mutex::new(None),
            }),
        }
    }

    /// Short name, e.g. `compile`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique path, e.g. `:app:compile`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// The module owning this configuration.
    #[must_use]
    pub fn module(&self) -> &ModuleVersionIdentifier {
        &self.inner.module
    }

    /// `configuration ':app:compile'`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("configuration '{}'", self.inner.path)
    }

    /// Current resolution state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.data.read().state
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Data) -> R) -> Result<R> {
        let mut data = self.inner.data.write();
        if data.state != State::Unresolved {
            return Err(Error::not_unresolved(self.display_name()));
        }
        Ok(f(&mut data))
    }

    // ------------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------------

    /// Whether the configuration is visible outside its project.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.data.read().visible
    }

    /// Set visibility.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.mutate(|d| d.visible = visible)
    }

    /// Whether dependencies are followed transitively.
    #[must_use]
    pub fn is_transitive(&self) -> bool {
        self.inner.data.read().transitive
    }

    /// Set transitivity.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn set_transitive(&self, transitive: bool) -> Result<()> {
        self.mutate(|d| d.transitive = transitive)
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.inner.data.read().description.clone()
    }

    /// Set the description.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn set_description(&self, description: impl Into<String>) -> Result<()> {
        let description = description.into();
        self.mutate(|d| d.description = Some(description))
    }

    // ------------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------------

    /// Direct parents.
    #[must_use]
    pub fn extends_from(&self) -> Vec<Self> {
        self.inner.data.read().extends_from.clone()
    }

    /// Add parents. Every candidate is checked before any is added.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::CyclicExtendsFrom`] if a candidate's hierarchy already
    /// contains this configuration, or when the configuration is resolved.
    pub fn extend(&self, others: &[&Self]) -> Result<()> {
        let _hierarchy = HIERARCHY_LOCK.lock();
        self.check_acyclic(others.iter().copied())?;
        self.mutate(|d| {
            for other in others {
                if !d.extends_from.contains(other) {
                    d.extends_from.push((*other).clone());
                }
            }
        })
    }

    /// Replace all parents.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::extend`].
    pub fn set_extends_from(&self, others: Vec<Self>) -> Result<()> {
        let _hierarchy = HIERARCHY_LOCK.lock();
        self.check_acyclic(others.iter())?;
        self.mutate(|d| {
            d.extends_from.clear();
            for other in others {
                if !d.extends_from.contains(&other) {
                    d.extends_from.push(other);
                }
            }
        })
    }

    fn check_acyclic<'a>(&self, others: impl Iterator<Item = &'a Self>) -> Result<()> {
        for other in others {
            let hierarchy = other.hierarchy();
            if hierarchy.contains(self) {
                return Err(Error::CyclicExtendsFrom {
                    configuration: self.display_name(),
                    other: other.display_name(),
                    hierarchy: hierarchy.iter().map(Self::display_name).collect(),
                });
            }
        }
        Ok(())
    }

    /// This configuration followed by every ancestor, each exactly once.
    ///
    /// Parents are visited depth first in declaration order. An ancestor reached
    /// again is moved to the end, so a shared ancestor always follows every
    /// configuration that extends it.
    #[must_use]
    pub fn hierarchy(&self) -> Vec<Self> {
        let mut result = IndexSet::new();
        result.insert(self.clone());
        Self::collect_super_configs(self, &mut result);
        result.into_iter().collect()
    }

    fn collect_super_configs(configuration: &Self, result: &mut IndexSet<Self>) {
        for parent in configuration.extends_from() {
            result.shift_remove(&parent);
            result.insert(parent.clone());
            Self::collect_super_configs(&parent, result);
        }
    }

    // ------------------------------------------------------------------------
    // Dependencies, artifacts and exclude rules
    // ------------------------------------------------------------------------

    /// Dependencies declared directly on this configuration.
    #[must_use]
    pub fn dependencies(&self) -> Vec<ModuleDependency> {
        self.inner.data.read().dependencies.iter().cloned().collect()
    }

    /// Dependencies of the whole hierarchy, own first, without duplicates.
    #[must_use]
    pub fn all_dependencies(&self) -> Vec<ModuleDependency> {
        let mut all = IndexSet::new();
        for configuration in self.hierarchy() {
            all.extend(configuration.dependencies());
        }
        all.into_iter().collect()
    }

    /// Declare a dependency.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn add_dependency(&self, dependency: ModuleDependency) -> Result<()> {
        self.mutate(|d| {
            d.dependencies.insert(dependency);
        })
    }

    /// Remove a dependency. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn remove_dependency(&self, dependency: &ModuleDependency) -> Result<bool> {
        self.mutate(|d| d.dependencies.shift_remove(dependency))
    }

    /// Artifacts published directly by this configuration.
    #[must_use]
    pub fn artifacts(&self) -> Vec<PublishArtifact> {
        self.inner.data.read().artifacts.iter().cloned().collect()
    }

    /// Artifacts of the whole hierarchy, own first, without duplicates.
    #[must_use]
    pub fn all_artifacts(&self) -> Vec<PublishArtifact> {
        let mut all = IndexSet::new();
        for configuration in self.hierarchy() {
            all.extend(configuration.artifacts());
        }
        all.into_iter().collect()
    }

    /// Add an artifact.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn add_artifact(&self, artifact: PublishArtifact) -> Result<()> {
        self.mutate(|d| {
            d.artifacts.insert(artifact);
        })
    }

    /// Remove an artifact. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn remove_artifact(&self, artifact: &PublishArtifact) -> Result<bool> {
        self.mutate(|d| d.artifacts.shift_remove(artifact))
    }

    /// Exclude rules declared on this configuration.
    #[must_use]
    pub fn exclude_rules(&self) -> Vec<ExcludeRule> {
        self.inner.data.read().exclude_rules.iter().cloned().collect()
    }

    /// Add an exclude rule.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn exclude(&self, rule: ExcludeRule) -> Result<()> {
        self.mutate(|d| {
            d.exclude_rules.insert(rule);
        })
    }

    /// Replace all exclude rules.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved.
    pub fn set_exclude_rules(&self, rules: Vec<ExcludeRule>) -> Result<()> {
        self.mutate(|d| d.exclude_rules = rules.into_iter().collect())
    }

    /// A copy of the resolution strategy.
    #[must_use]
    pub fn resolution_strategy(&self) -> ResolutionStrategy {
        self.inner.data.read().resolution_strategy.clone()
    }

    /// Modify the resolution strategy.
    ///
    /// # Errors
    ///
    /// Fails once the configuration is resolved, or with whatever `f` returns.
    pub fn update_resolution_strategy(
        &self,
        f: impl FnOnce(&mut ResolutionStrategy) -> depot_core::Result<()>,
    ) -> Result<()> {
        let outcome = self.mutate(|d| -> depot_core::Result<()> {
            let mut strategy = d.resolution_strategy.clone();
            f(&mut strategy)?;
            d.resolution_strategy = strategy;
            Ok(())
        })?;
        Ok(outcome?)
    }

    // ------------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------------

    /// Run `listener` right before this configuration is resolved.
    pub fn before_resolve(&self, listener: impl Fn(&Self) + Send + Sync + 'static) {
        self.inner.listeners.lock().before.push(Arc::new(listener));
    }

    /// Run `listener` right after this configuration is resolved.
    pub fn after_resolve(
        &self,
        listener: impl Fn(&Self, &dyn ResolvedConfiguration) + Send + Sync + 'static,
    ) {
        self.inner.listeners.lock().after.push(Arc::new(listener));
    }

    /// Resolve the configuration, or return the cached result.
    ///
    /// Concurrent callers block until the first resolution finishes and then
    /// share its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolver fails outright. The configuration then
    /// stays unresolved.
    pub fn resolve(&self) -> Result<Arc<dyn ResolvedConfiguration>> {
        let mut cached = self.inner.resolution.lock();
        if let Some(resolved) = cached.as_ref() {
            return Ok(Arc::clone(resolved));
        }

        let before = self.inner.listeners.lock().before.clone();
        for listener in &before {
            listener(self);
        }

        debug!(configuration = %self.inner.path, "Resolving configuration");
        let resolved = self.inner.resolver.resolve(self)?;
        let state = if resolved.has_error() {
            State::ResolvedWithFailures
        } else {
            State::Resolved
        };
        self.inner.data.write().state = state;
        *cached = Some(Arc::clone(&resolved));
        drop(cached);

        let after = self.inner.listeners.lock().after.clone();
        for listener in &after {
            listener(self, resolved.as_ref());
        }
        Ok(resolved)
    }

    /// Alias of [`Configuration::resolve`].
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::resolve`].
    pub fn resolved_configuration(&self) -> Result<Arc<dyn ResolvedConfiguration>> {
        self.resolve()
    }

    /// Resolve and return every artifact file.
    ///
    /// # Errors
    ///
    /// Fails if any dependency could not be resolved or a file cannot be
    /// materialized.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        self.files_matching(|_| true)
    }

    /// Resolve and return artifact files reachable from the first-level
    /// dependencies accepted by `spec`.
    ///
    /// # Errors
    ///
    /// Same as [`Configuration::files`].
    pub fn files_matching(
        &self,
        spec: impl Fn(&ModuleDependency) -> bool,
    ) -> Result<Vec<PathBuf>> {
        let resolved = self.resolve()?;
        if self.state() == State::ResolvedWithFailures {
            resolved.rethrow_failure()?;
        }
        resolved.files(&spec)
    }

    /// View over the files of [`Configuration::all_artifacts`].
    #[must_use]
    pub fn all_artifact_files(&self) -> ArtifactFileCollection {
        ArtifactFileCollection::new(self.clone())
    }

    // ------------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------------

    /// An unresolved copy holding this configuration's own dependencies.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.create_copy(self.dependencies(), false)
    }

    /// An unresolved copy holding every dependency of the hierarchy.
    #[must_use]
    pub fn copy_recursive(&self) -> Self {
        self.create_copy(self.all_dependencies(), true)
    }

    /// Like [`Configuration::copy`], keeping only dependencies accepted by `spec`.
    #[must_use]
    pub fn copy_matching(&self, spec: impl Fn(&ModuleDependency) -> bool) -> Self {
        let dependencies = self.dependencies().into_iter().filter(|d| spec(d)).collect();
        self.create_copy(dependencies, false)
    }

    /// Like [`Configuration::copy_recursive`], keeping only dependencies
    /// accepted by `spec`.
    #[must_use]
    pub fn copy_recursive_matching(&self, spec: impl Fn(&ModuleDependency) -> bool) -> Self {
        let dependencies = self
            .all_dependencies()
            .into_iter()
            .filter(|d| spec(d))
            .collect();
        self.create_copy(dependencies, true)
    }

    fn create_copy(&self, dependencies: Vec<ModuleDependency>, recursive: bool) -> Self {
        let (visible, transitive, description, strategy) = {
            let data = self.inner.data.read();
            (
                data.visible,
                data.transitive,
                data.description.clone(),
                data.resolution_strategy.copy(),
            )
        };
        let exclude_rules: Vec<ExcludeRule> = if recursive {
            self.hierarchy()
                .iter()
                .flat_map(Self::exclude_rules)
                .collect()
        } else {
            self.exclude_rules()
        };

        let copy = Self::new(
            format!("{}Copy", self.inner.name),
            format!("{}Copy", self.inner.path),
            self.inner.module.clone(),
            Arc::clone(&self.inner.resolver),
            strategy,
        );
        {
            let mut data = copy.inner.data.write();
            data.visible = visible;
            data.transitive = transitive;
            data.description = description;
            data.artifacts = self.all_artifacts().into_iter().collect();
            data.exclude_rules = exclude_rules.into_iter().collect();
            data.dependencies = dependencies.iter().map(ModuleDependency::copy).collect();
        }
        debug!(source = %self.inner.path, copy = %copy.path(), recursive, "Copied configuration");
        copy
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
