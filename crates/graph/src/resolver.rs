//! The default configuration resolver.
//!
//! Builds the dependency graph, binds an artifact set to every edge, streams
//! the graph into a transient result log and hands back a result that replays
//! the log on demand.

use crate::artifacts::{ArtifactResolutionCoordinator, ArtifactResolver, ArtifactSet};
use crate::builder::{DependencyGraph, DependencyGraphBuilder, RootConfiguration};
use crate::error::Result;
use crate::metadata::ModuleMetadataSource;
use depot_configurations::{
    Configuration, ConfigurationResolver, ResolvedConfiguration, UnresolvedDependency,
};
use depot_core::{ModuleDependency, ModuleVersionIdentifier};
use depot_results::TransientConfigurationResultsBuilder;
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Resolves configurations against a metadata source and an artifact
/// resolver.
#[derive(Clone)]
pub struct DefaultConfigurationResolver {
    source: Arc<dyn ModuleMetadataSource>,
    artifacts: Arc<dyn ArtifactResolver>,
}

impl DefaultConfigurationResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(source: Arc<dyn ModuleMetadataSource>, artifacts: Arc<dyn ArtifactResolver>) -> Self {
        Self { source, artifacts }
    }
}

impl fmt::Debug for DefaultConfigurationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultConfigurationResolver").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct FirstLevel {
    dependency: ModuleDependency,
    module: ModuleVersionIdentifier,
    node: u64,
    artifact_set: u64,
}

fn node_id(node: petgraph::graph::NodeIndex) -> u64 {
    node.index() as u64
}

/// Write the graph to `results`, asking `coordinator` for the artifact set of
/// every edge.
fn write_results(
    graph: &DependencyGraph,
    coordinator: &mut ArtifactResolutionCoordinator,
    results: &TransientConfigurationResultsBuilder,
) -> Result<Vec<FirstLevel>> {
    let inner = graph.graph();
    for node in inner.node_indices() {
        results.resolved_dependency(node_id(node), &inner[node].identifier)?;
    }

    let mut first_level = Vec::new();
    for parent in inner.node_indices() {
        for (child, edge) in graph.children(parent) {
            let target = &inner[child];
            let Some(metadata) = &target.metadata else {
                continue;
            };
            let set = coordinator.artifacts(
                &edge.dependency,
                metadata,
                &target.identifier.configuration,
            );
            results.parent_child(node_id(parent), node_id(child), set.id())?;

            if parent == graph.root() {
                first_level.push(FirstLevel {
                    dependency: edge.dependency.clone(),
                    module: target.identifier.module.clone(),
                    node: node_id(child),
                    artifact_set: set.id(),
                });
            }
        }
    }

    let mut marked = IndexSet::new();
    for entry in &first_level {
        if marked.insert(entry.node) {
            results.first_level_dependency(entry.node)?;
        }
    }
    results.done(node_id(graph.root()))?;
    Ok(first_level)
}

impl DefaultConfigurationResolver {
    /// Resolve `configuration` and keep the concrete result type.
    ///
    /// # Errors
    ///
    /// Fails only when the result log cannot be written. Unresolvable
    /// dependencies are part of the returned result.
    pub fn resolve_configuration(
        &self,
        configuration: &Configuration,
    ) -> depot_configurations::Result<Arc<DefaultResolvedConfiguration>> {
        let display_name = configuration.display_name();
        depot_events::emit_resolution_started!(display_name);

        let root = RootConfiguration::from_configuration(configuration);
        let graph = DependencyGraphBuilder::new(
            self.source.as_ref(),
            configuration.resolution_strategy(),
        )
        .resolve(&root);

        let results = TransientConfigurationResultsBuilder::new()
            .map_err(|e| depot_configurations::Error::resolver(&display_name, e))?;
        let mut coordinator = ArtifactResolutionCoordinator::new(Arc::clone(&self.artifacts));
        let written = write_results(&graph, &mut coordinator, &results);
        let artifact_sets = coordinator.finish();
        let first_level =
            written.map_err(|e| depot_configurations::Error::resolver(&display_name, e))?;

        for failure in graph.failures() {
            depot_events::emit_resolution_failure!(display_name, failure.selector(), failure.problem());
        }
        depot_events::emit_resolution_completed!(
            display_name,
            graph.node_count(),
            graph.failures().len()
        );

        Ok(Arc::new(DefaultResolvedConfiguration {
            configuration: display_name,
            results,
            artifact_sets,
            first_level,
            failures: graph.failures().to_vec(),
        }))
    }
}

impl ConfigurationResolver for DefaultConfigurationResolver {
    fn resolve(
        &self,
        configuration: &Configuration,
    ) -> depot_configurations::Result<Arc<dyn ResolvedConfiguration>> {
        let resolved: Arc<dyn ResolvedConfiguration> = self.resolve_configuration(configuration)?;
        Ok(resolved)
    }
}

/// Result of [`DefaultConfigurationResolver`]. The graph lives in the
/// transient result log and is replayed the first time files are requested.
pub struct DefaultResolvedConfiguration {
    configuration: String,
    results: TransientConfigurationResultsBuilder,
    artifact_sets: IndexMap<u64, ArtifactSet>,
    first_level: Vec<FirstLevel>,
    failures: Vec<UnresolvedDependency>,
}

impl DefaultResolvedConfiguration {
    /// Artifact set by id.
    #[must_use]
    pub fn artifact_set(&self, id: u64) -> Option<&ArtifactSet> {
        self.artifact_sets.get(&id)
    }

    /// The replayed graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the result log is corrupt or was cleared.
    pub fn results(&self) -> depot_results::Result<Arc<depot_results::TransientConfigurationResults>> {
        self.results.load()
    }

    /// Artifact set ids reachable from the first-level dependencies accepted
    /// by `spec`, in walk order.
    fn reachable_sets(
        &self,
        spec: &dyn Fn(&ModuleDependency) -> bool,
    ) -> depot_results::Result<IndexSet<u64>> {
        let results = self.results.load()?;
        let mut sets = IndexSet::new();
        let mut visited = IndexSet::new();
        let mut queue = VecDeque::new();
        for entry in self.first_level.iter().filter(|e| spec(&e.dependency)) {
            sets.insert(entry.artifact_set);
            queue.push_back(entry.node);
        }

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            for edge in results.outgoing_edges(node) {
                sets.insert(edge.artifact_set_id);
                queue.push_back(edge.child);
            }
        }
        debug!(
            configuration = %self.configuration,
            nodes = visited.len(),
            sets = sets.len(),
            "collected artifact sets"
        );
        Ok(sets)
    }
}

impl fmt::Debug for DefaultResolvedConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultResolvedConfiguration")
            .field("configuration", &self.configuration)
            .field("first_level", &self.first_level.len())
            .field("failures", &self.failures.len())
            .finish_non_exhaustive()
    }
}

impl ResolvedConfiguration for DefaultResolvedConfiguration {
    fn configuration(&self) -> &str {
        &self.configuration
    }

    fn unresolved_dependencies(&self) -> Vec<UnresolvedDependency> {
        self.failures.clone()
    }

    fn first_level_modules(
        &self,
        spec: &dyn Fn(&ModuleDependency) -> bool,
    ) -> Vec<ModuleVersionIdentifier> {
        let modules: IndexSet<&ModuleVersionIdentifier> = self
            .first_level
            .iter()
            .filter(|e| spec(&e.dependency))
            .map(|e| &e.module)
            .collect();
        modules.into_iter().cloned().collect()
    }

    fn files(
        &self,
        spec: &dyn Fn(&ModuleDependency) -> bool,
    ) -> depot_configurations::Result<Vec<PathBuf>> {
        let sets = self
            .reachable_sets(spec)
            .map_err(|e| depot_configurations::Error::resolver(&self.configuration, e))?;
        let mut files = IndexSet::new();
        for id in sets {
            let Some(set) = self.artifact_sets.get(&id) else {
                continue;
            };
            for artifact in set.artifacts() {
                files.insert(artifact.file()?);
            }
        }
        Ok(files.into_iter().collect())
    }
}
