//! Artifact sets bound to graph edges.
//!
//! Every edge of a resolved graph contributes an [`ArtifactSet`]. Edges that
//! take all artifacts of their target configuration share one set per target,
//! while edges naming explicit artifacts or filtering them get a private set.
//! Files are only fetched when a [`ResolvedArtifact`] is first asked for one.

use crate::metadata::ModuleMetadata;
use depot_core::{
    ArtifactName, ComponentArtifactIdentifier, ModuleDependency, ModuleVersionIdentifier,
    ResolvedConfigurationIdentifier,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Boxed error returned by artifact resolvers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Downloads or locates the file of an artifact.
pub trait ArtifactResolver: Send + Sync {
    /// Return the local file for `artifact`.
    ///
    /// # Errors
    ///
    /// Returns an error when the artifact cannot be fetched.
    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> Result<PathBuf, BoxError>;
}

type FileFactory = dyn Fn() -> Result<PathBuf, BoxError> + Send + Sync;

struct ArtifactInner {
    id: ComponentArtifactIdentifier,
    file: OnceLock<PathBuf>,
    factory: Box<FileFactory>,
}

/// An artifact of a resolved module whose file is fetched on first access.
///
/// Clones share the memoized file.
#[derive(Clone)]
pub struct ResolvedArtifact {
    inner: Arc<ArtifactInner>,
}

impl ResolvedArtifact {
    /// Create an artifact backed by `factory`.
    pub fn new(
        id: ComponentArtifactIdentifier,
        factory: impl Fn() -> Result<PathBuf, BoxError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(ArtifactInner {
                id,
                file: OnceLock::new(),
                factory: Box::new(factory),
            }),
        }
    }

    /// Owning module and artifact name.
    #[must_use]
    pub fn id(&self) -> &ComponentArtifactIdentifier {
        &self.inner.id
    }

    /// Owning module version.
    #[must_use]
    pub fn module(&self) -> &ModuleVersionIdentifier {
        &self.inner.id.component
    }

    /// Artifact name.
    #[must_use]
    pub fn name(&self) -> &ArtifactName {
        &self.inner.id.artifact
    }

    /// Whether the file has been fetched already.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.inner.file.get().is_some()
    }

    /// The artifact file, fetched on the first call.
    ///
    /// Two threads asking at the same time may both fetch; the first result
    /// stored is the one every later call sees.
    ///
    /// # Errors
    ///
    /// Returns an error when the resolver fails. A failed fetch is retried on
    /// the next call.
    pub fn file(&self) -> depot_configurations::Result<PathBuf> {
        if let Some(file) = self.inner.file.get() {
            return Ok(file.clone());
        }
        let fetched = (self.inner.factory)()
            .map_err(|e| depot_configurations::Error::artifact(self.inner.id.display_name(), e))?;
        depot_events::emit_artifact_resolved!(self.inner.id);
        Ok(self.inner.file.get_or_init(|| fetched).clone())
    }
}

impl PartialEq for ResolvedArtifact {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ResolvedArtifact {}

impl fmt::Debug for ResolvedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedArtifact")
            .field("id", &self.inner.id)
            .field("file", &self.inner.file.get())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ResolvedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.id, f)
    }
}

/// An immutable group of artifacts with a stable id.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    id: u64,
    artifacts: Arc<Vec<ResolvedArtifact>>,
}

impl ArtifactSet {
    /// The set id written to the result log.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Artifacts in declaration order.
    #[must_use]
    pub fn artifacts(&self) -> &[ResolvedArtifact] {
        &self.artifacts
    }

    /// Number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether the set holds no artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Hands out artifact sets for the edges of one resolution.
pub struct ArtifactResolutionCoordinator {
    resolver: Arc<dyn ArtifactResolver>,
    next_id: u64,
    all_resolved_artifacts: HashMap<ComponentArtifactIdentifier, ResolvedArtifact>,
    artifact_sets_by_configuration: HashMap<ResolvedConfigurationIdentifier, ArtifactSet>,
    sets: IndexMap<u64, ArtifactSet>,
}

impl ArtifactResolutionCoordinator {
    /// A coordinator fetching files through `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            resolver,
            next_id: 0,
            all_resolved_artifacts: HashMap::new(),
            artifact_sets_by_configuration: HashMap::new(),
            sets: IndexMap::new(),
        }
    }

    /// The artifact set for an edge following `dependency` into
    /// `configuration` of `target`.
    pub fn artifacts(
        &mut self,
        dependency: &ModuleDependency,
        target: &ModuleMetadata,
        configuration: &str,
    ) -> ArtifactSet {
        if !dependency.artifacts.is_empty() {
            let names = dependency
                .artifacts
                .iter()
                .map(depot_core::DependencyArtifact::to_artifact_name)
                .collect();
            return self.create_set(target.id(), names);
        }

        if dependency.accepts_all_artifacts() {
            let key = ResolvedConfigurationIdentifier::new(target.id().clone(), configuration);
            if let Some(set) = self.artifact_sets_by_configuration.get(&key) {
                return set.clone();
            }
            let set = self.create_set(target.id(), target.artifacts(configuration));
            debug!(configuration = %key, set = set.id(), "sharing artifact set");
            self.artifact_sets_by_configuration.insert(key, set.clone());
            return set;
        }

        let names = target
            .artifacts(configuration)
            .into_iter()
            .filter(|a| dependency.artifact_selector.accepts(a))
            .collect();
        self.create_set(target.id(), names)
    }

    fn create_set(&mut self, component: &ModuleVersionIdentifier, names: Vec<ArtifactName>) -> ArtifactSet {
        let artifacts = names
            .into_iter()
            .map(|name| self.resolved_artifact(ComponentArtifactIdentifier::new(component.clone(), name)))
            .collect();
        let set = ArtifactSet {
            id: self.next_id,
            artifacts: Arc::new(artifacts),
        };
        self.next_id += 1;
        self.sets.insert(set.id, set.clone());
        set
    }

    fn resolved_artifact(&mut self, id: ComponentArtifactIdentifier) -> ResolvedArtifact {
        let resolver = Arc::clone(&self.resolver);
        self.all_resolved_artifacts
            .entry(id.clone())
            .or_insert_with(|| {
                let target = id.clone();
                ResolvedArtifact::new(id, move || resolver.resolve_artifact(&target))
            })
            .clone()
    }

    /// Number of entries held in the per-resolution caches.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.all_resolved_artifacts.len() + self.artifact_sets_by_configuration.len()
    }

    /// Drop the per-resolution caches and hand over every set created so far,
    /// keyed by id.
    pub fn finish(&mut self) -> IndexMap<u64, ArtifactSet> {
        self.all_resolved_artifacts.clear();
        self.artifact_sets_by_configuration.clear();
        std::mem::take(&mut self.sets)
    }
}

impl fmt::Debug for ArtifactResolutionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactResolutionCoordinator")
            .field("next_id", &self.next_id)
            .field("cached_entries", &self.cached_entries())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{ArtifactFilter, ArtifactSelector, DependencyArtifact};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl ArtifactResolver for CountingResolver {
        fn resolve_artifact(
            &self,
            artifact: &ComponentArtifactIdentifier,
        ) -> Result<PathBuf, BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from("/repo").join(artifact.file_name()))
        }
    }

    fn target() -> ModuleMetadata {
        ModuleMetadata::new(ModuleVersionIdentifier::new("org", "lib", "1.0")).with_artifact(
            "default",
            ArtifactName::new("lib", "jar", Some("sources".into())),
        )
    }

    fn coordinator() -> (Arc<CountingResolver>, ArtifactResolutionCoordinator) {
        let resolver = Arc::new(CountingResolver::default());
        let coordinator = ArtifactResolutionCoordinator::new(resolver.clone());
        (resolver, coordinator)
    }

    #[test]
    fn test_unfiltered_edges_share_a_set() {
        let (_, mut coordinator) = coordinator();
        let target = target();
        let first = coordinator.artifacts(&ModuleDependency::new("org", "lib", "1.0"), &target, "default");
        let second = coordinator.artifacts(
            &ModuleDependency::new("org", "lib", "1.0").with_transitive(false),
            &target,
            "default",
        );
        assert_eq!(first.id(), second.id());
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_filtered_edges_get_private_sets() {
        let (_, mut coordinator) = coordinator();
        let target = target();
        let shared = coordinator.artifacts(&ModuleDependency::new("org", "lib", "1.0"), &target, "default");
        let selector = ArtifactSelector::Matching(ArtifactFilter {
            extension: Some("jar".into()),
            classifier: Some("sources".into()),
        });
        let filtered = ModuleDependency::new("org", "lib", "1.0").with_selector(selector);
        let first = coordinator.artifacts(&filtered, &target, "default");
        let second = coordinator.artifacts(&filtered, &target, "default");

        assert_ne!(first.id(), shared.id());
        assert_ne!(first.id(), second.id());
        assert_eq!(first.len(), 1);
        assert_eq!(first.artifacts()[0].name().classifier.as_deref(), Some("sources"));
    }

    #[test]
    fn test_explicit_artifacts_get_dedicated_set() {
        let (_, mut coordinator) = coordinator();
        let target = target();
        let dependency = ModuleDependency::new("org", "lib", "1.0")
            .with_artifact(DependencyArtifact::new("lib", "zip", Some("dist".into())));
        let set = coordinator.artifacts(&dependency, &target, "default");
        assert_eq!(set.len(), 1);
        assert_eq!(set.artifacts()[0].id().file_name(), "lib-1.0-dist.zip");
    }

    #[test]
    fn test_same_artifact_converges_across_sets() {
        let (resolver, mut coordinator) = coordinator();
        let target = target();
        let shared = coordinator.artifacts(&ModuleDependency::new("org", "lib", "1.0"), &target, "default");
        let filtered = coordinator.artifacts(
            &ModuleDependency::new("org", "lib", "1.0").with_selector(ArtifactSelector::Matching(
                ArtifactFilter {
                    extension: Some("jar".into()),
                    classifier: None,
                },
            )),
            &target,
            "default",
        );

        let jar = &shared.artifacts()[0];
        assert!(!jar.is_materialized());
        assert_eq!(jar.file().unwrap(), PathBuf::from("/repo/lib-1.0.jar"));
        assert_eq!(&filtered.artifacts()[0], jar);
        assert!(filtered.artifacts()[0].is_materialized());
        filtered.artifacts()[0].file().unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finish_clears_caches() {
        let (_, mut coordinator) = coordinator();
        let target = target();
        let set = coordinator.artifacts(&ModuleDependency::new("org", "lib", "1.0"), &target, "default");
        assert!(coordinator.cached_entries() > 0);

        let sets = coordinator.finish();
        assert_eq!(coordinator.cached_entries(), 0);
        assert!(sets.contains_key(&set.id()));

        let again = coordinator.artifacts(&ModuleDependency::new("org", "lib", "1.0"), &target, "default");
        assert_ne!(again.id(), set.id());
    }

    #[test]
    fn test_failed_fetch_is_retried() {
        struct Flaky(AtomicUsize);
        impl ArtifactResolver for Flaky {
            fn resolve_artifact(
                &self,
                _artifact: &ComponentArtifactIdentifier,
            ) -> Result<PathBuf, BoxError> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("connection reset".into())
                } else {
                    Ok(PathBuf::from("/repo/lib-1.0.jar"))
                }
            }
        }

        let mut coordinator = ArtifactResolutionCoordinator::new(Arc::new(Flaky(AtomicUsize::new(0))));
        let set = coordinator.artifacts(
            &ModuleDependency::new("org", "lib", "1.0"),
            &ModuleMetadata::new(ModuleVersionIdentifier::new("org", "lib", "1.0")),
            "default",
        );
        let artifact = &set.artifacts()[0];
        let err = artifact.file().unwrap_err();
        assert!(err.to_string().contains("lib-1.0.jar (org:lib:1.0)"));
        assert!(artifact.file().is_ok());
    }
}
