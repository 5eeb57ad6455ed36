//! Dependency graph construction.
//!
//! The builder walks the root configuration's dependencies and the metadata of
//! every module they reach. Conflicts are settled by repeating the walk: each
//! pass records every version requested per module, the conflict policy picks
//! a winner per module from everything requested so far, and the next pass
//! follows the winners. Candidate sets only grow, so the selection settles and
//! the last pass becomes the graph. Nodes of losing versions never make it into
//! that pass, which is how they are evicted.

use crate::error::ModuleVersionResolveError;
use crate::metadata::{ModuleMetadata, ModuleMetadataSource};
use depot_configurations::{Configuration, UnresolvedDependency};
use depot_core::{
    ConflictResolution, ExcludeRule, ModuleDependency, ModuleIdentifier, ModuleVersionIdentifier,
    ModuleVersionSelector, ResolutionStrategy, ResolvedConfigurationIdentifier, exclude,
};
use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// What the walk starts from: the declarations of a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootConfiguration {
    /// Owning module and configuration name.
    pub identifier: ResolvedConfigurationIdentifier,
    /// Every dependency of the configuration hierarchy.
    pub dependencies: Vec<ModuleDependency>,
    /// Exclude rules of the configuration hierarchy.
    pub excludes: Vec<ExcludeRule>,
    /// Whether first-level dependencies are followed.
    pub transitive: bool,
}

impl RootConfiguration {
    /// Snapshot the declarations of `configuration` and everything it extends.
    #[must_use]
    pub fn from_configuration(configuration: &Configuration) -> Self {
        let mut excludes: IndexSet<ExcludeRule> = IndexSet::new();
        for member in configuration.hierarchy() {
            excludes.extend(member.exclude_rules());
        }
        Self {
            identifier: ResolvedConfigurationIdentifier::new(
                configuration.module().clone(),
                configuration.name(),
            ),
            dependencies: configuration.all_dependencies(),
            excludes: excludes.into_iter().collect(),
            transitive: configuration.is_transitive(),
        }
    }
}

/// A node of the resolved graph: one configuration of one module version.
#[derive(Debug, Clone)]
pub struct DependencyGraphNode {
    /// Module version and configuration.
    pub identifier: ResolvedConfigurationIdentifier,
    /// Metadata of the module, absent for the root.
    pub metadata: Option<Arc<ModuleMetadata>>,
}

/// An edge of the resolved graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyGraphEdge {
    /// The declaration the edge follows.
    pub dependency: ModuleDependency,
}

/// A dependency that ends at the root, kept apart from the transitive graph.
#[derive(Debug, Clone)]
pub struct FirstLevelDependency {
    /// The declaration in the root configuration.
    pub dependency: ModuleDependency,
    /// The node it resolved to.
    pub node: NodeIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Version(String),
    Conflict(Vec<String>),
}

struct Failure {
    problem: Arc<ModuleVersionResolveError>,
    from: IndexSet<ResolvedConfigurationIdentifier>,
}

/// Everything one walk produced.
#[derive(Default)]
struct Pass {
    requested: IndexMap<ModuleIdentifier, Vec<String>>,
    nodes: IndexMap<ResolvedConfigurationIdentifier, Option<Arc<ModuleMetadata>>>,
    edges: IndexSet<(ResolvedConfigurationIdentifier, ResolvedConfigurationIdentifier, ModuleDependency)>,
    first_level: IndexSet<(ModuleDependency, ResolvedConfigurationIdentifier)>,
    failures: IndexMap<ModuleVersionSelector, Failure>,
}

impl Pass {
    fn request(&mut self, dependency: &ModuleDependency) {
        let versions = self.requested.entry(dependency.module()).or_default();
        if !versions.contains(&dependency.version) {
            versions.push(dependency.version.clone());
        }
    }

    fn fail(
        &mut self,
        dependency: &ModuleDependency,
        from: &ResolvedConfigurationIdentifier,
        problem: Arc<ModuleVersionResolveError>,
    ) {
        debug!(selector = %dependency.selector(), from = %from, problem = %problem, "unresolved dependency");
        self.failures
            .entry(dependency.selector())
            .or_insert_with(|| Failure {
                problem,
                from: IndexSet::new(),
            })
            .from
            .insert(from.clone());
    }
}

struct Visit {
    node: ResolvedConfigurationIdentifier,
    excludes: BTreeSet<ExcludeRule>,
}

type MetadataLookup = Result<Arc<ModuleMetadata>, Arc<ModuleVersionResolveError>>;

/// Builds a [`DependencyGraph`] from a root configuration.
pub struct DependencyGraphBuilder<'a> {
    source: &'a dyn ModuleMetadataSource,
    strategy: ResolutionStrategy,
    metadata: HashMap<ModuleVersionSelector, MetadataLookup>,
}

impl<'a> DependencyGraphBuilder<'a> {
    /// A builder reading metadata from `source` and settling conflicts with
    /// `strategy`.
    #[must_use]
    pub fn new(source: &'a dyn ModuleMetadataSource, strategy: ResolutionStrategy) -> Self {
        Self {
            source,
            strategy,
            metadata: HashMap::new(),
        }
    }

    /// Resolve the graph below `root`.
    ///
    /// Unresolvable modules never abort the walk; they are collected on the
    /// returned graph together with every path that requested them.
    pub fn resolve(&mut self, root: &RootConfiguration) -> DependencyGraph {
        let forced = self.forced_versions(root);
        let policy = self.strategy.conflict_resolution();
        let mut candidates: IndexMap<ModuleIdentifier, Vec<String>> = IndexMap::new();
        let mut selections: HashMap<ModuleIdentifier, Selection> = HashMap::new();
        let mut passes = 0usize;

        loop {
            passes += 1;
            let pass = self.walk(root, &selections, &forced);
            for (module, versions) in &pass.requested {
                let known = candidates.entry(module.clone()).or_default();
                for version in versions {
                    if !known.contains(version) {
                        known.push(version.clone());
                    }
                }
            }

            let next: HashMap<ModuleIdentifier, Selection> = candidates
                .iter()
                .map(|(module, versions)| {
                    (module.clone(), select(policy, &forced, module, versions))
                })
                .collect();
            if next == selections {
                debug!(root = %root.identifier, passes, nodes = pass.nodes.len(), "dependency graph settled");
                return DependencyGraph::finish(pass);
            }
            selections = next;
        }
    }

    fn forced_versions(&self, root: &RootConfiguration) -> HashMap<ModuleIdentifier, String> {
        let mut forced: HashMap<ModuleIdentifier, String> = self
            .strategy
            .forced_modules()
            .iter()
            .map(|s| (s.module(), s.version.clone()))
            .collect();
        for dependency in root.dependencies.iter().filter(|d| d.force) {
            forced.insert(dependency.module(), dependency.version.clone());
        }
        forced
    }

    fn lookup(&mut self, selector: ModuleVersionSelector) -> MetadataLookup {
        if let Some(found) = self.metadata.get(&selector) {
            return found.clone();
        }
        let found = self.source.resolve(&selector).map_err(Arc::new);
        self.metadata.insert(selector, found.clone());
        found
    }

    fn walk(
        &mut self,
        root: &RootConfiguration,
        selections: &HashMap<ModuleIdentifier, Selection>,
        forced: &HashMap<ModuleIdentifier, String>,
    ) -> Pass {
        let mut pass = Pass::default();
        pass.nodes.insert(root.identifier.clone(), None);

        let mut visited: HashSet<(ResolvedConfigurationIdentifier, BTreeSet<ExcludeRule>)> =
            HashSet::new();
        let mut queue = VecDeque::from([Visit {
            node: root.identifier.clone(),
            excludes: BTreeSet::new(),
        }]);

        while let Some(visit) = queue.pop_front() {
            if !visited.insert((visit.node.clone(), visit.excludes.clone())) {
                continue;
            }
            let is_root = visit.node == root.identifier;
            let (dependencies, own_excludes, transitive) = if is_root {
                (root.dependencies.clone(), root.excludes.clone(), root.transitive)
            } else {
                let Some(Some(metadata)) = pass.nodes.get(&visit.node) else {
                    continue;
                };
                let configuration = visit.node.configuration.as_str();
                (
                    metadata.dependencies(configuration).into_iter().cloned().collect(),
                    metadata.excludes(configuration).into_iter().cloned().collect(),
                    metadata.is_transitive(configuration),
                )
            };

            for dependency in &dependencies {
                let mut excludes = visit.excludes.clone();
                excludes.extend(own_excludes.iter().cloned());
                excludes.extend(dependency.excludes.iter().cloned());
                if exclude::is_excluded(&excludes, &dependency.module()) {
                    debug!(from = %visit.node, dependency = %dependency, "excluded");
                    continue;
                }

                let Some(target) = self.edge(&mut pass, &visit.node, dependency, selections, forced)
                else {
                    continue;
                };
                if is_root {
                    pass.first_level.insert((dependency.clone(), target.clone()));
                }
                if transitive && dependency.transitive {
                    queue.push_back(Visit {
                        node: target,
                        excludes,
                    });
                }
            }
        }
        pass
    }

    /// Follow one declaration from `from`. Returns the target node, or `None`
    /// after recording a failure.
    fn edge(
        &mut self,
        pass: &mut Pass,
        from: &ResolvedConfigurationIdentifier,
        dependency: &ModuleDependency,
        selections: &HashMap<ModuleIdentifier, Selection>,
        forced: &HashMap<ModuleIdentifier, String>,
    ) -> Option<ResolvedConfigurationIdentifier> {
        pass.request(dependency);
        let module = dependency.module();

        let version = match (forced.get(&module), selections.get(&module)) {
            (Some(version), _) | (None, Some(Selection::Version(version))) => version.clone(),
            (None, Some(Selection::Conflict(versions))) => {
                let conflict = depot_core::Error::VersionConflict {
                    module: module.to_string(),
                    versions: versions.clone(),
                };
                pass.fail(
                    dependency,
                    from,
                    Arc::new(ModuleVersionResolveError::Conflict(conflict)),
                );
                return None;
            }
            (None, None) => dependency.version.clone(),
        };

        let selector = ModuleVersionSelector::new(&dependency.group, &dependency.name, version);
        let metadata = match self.lookup(selector) {
            Ok(metadata) => metadata,
            Err(problem) => {
                pass.fail(dependency, from, problem);
                return None;
            }
        };

        let configuration = dependency.target_configuration();
        if metadata.configuration(configuration).is_none() {
            let problem = ModuleVersionResolveError::ConfigurationNotFound {
                module: metadata.id().clone(),
                configuration: configuration.to_string(),
            };
            pass.fail(dependency, from, Arc::new(problem));
            return None;
        }

        let target = ResolvedConfigurationIdentifier::new(metadata.id().clone(), configuration);
        pass.nodes
            .entry(target.clone())
            .or_insert_with(|| Some(metadata));
        if pass
            .edges
            .insert((from.clone(), target.clone(), dependency.clone()))
        {
            debug!(from = %from, to = %target, "edge");
        }
        Some(target)
    }
}

fn select(
    policy: ConflictResolution,
    forced: &HashMap<ModuleIdentifier, String>,
    module: &ModuleIdentifier,
    versions: &[String],
) -> Selection {
    if let Some(version) = forced.get(module) {
        return Selection::Version(version.clone());
    }
    match policy.select(module, versions) {
        Ok(version) => Selection::Version(version),
        Err(_) => Selection::Conflict(versions.to_vec()),
    }
}

/// A resolved dependency graph.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<DependencyGraphNode, DependencyGraphEdge>,
    root: NodeIndex,
    first_level: Vec<FirstLevelDependency>,
    failures: Vec<UnresolvedDependency>,
}

impl DependencyGraph {
    fn finish(pass: Pass) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<ResolvedConfigurationIdentifier, NodeIndex> = HashMap::new();
        for (identifier, metadata) in pass.nodes {
            let node = graph.add_node(DependencyGraphNode {
                identifier: identifier.clone(),
                metadata,
            });
            index.insert(identifier, node);
        }
        // The root is always inserted first.
        let root = NodeIndex::new(0);

        for (from, to, dependency) in pass.edges {
            if let (Some(&from), Some(&to)) = (index.get(&from), index.get(&to)) {
                graph.add_edge(from, to, DependencyGraphEdge { dependency });
            }
        }

        let first_level = pass
            .first_level
            .into_iter()
            .filter_map(|(dependency, target)| {
                index
                    .get(&target)
                    .map(|&node| FirstLevelDependency { dependency, node })
            })
            .collect();

        let mut resolved = Self {
            graph,
            root,
            first_level,
            failures: Vec::new(),
        };
        resolved.failures = pass
            .failures
            .into_iter()
            .map(|(selector, failure)| {
                let mut paths: IndexSet<Vec<ModuleVersionIdentifier>> = IndexSet::new();
                for from in &failure.from {
                    if let Some(&node) = index.get(from) {
                        paths.extend(resolved.calculate_paths(node));
                    }
                }
                UnresolvedDependency::new(selector, failure.problem, paths.into_iter().collect())
            })
            .collect();
        resolved
    }

    /// Every module path from the root down to `node`, walking incoming edges
    /// backwards and skipping cycles.
    fn calculate_paths(&self, node: NodeIndex) -> Vec<Vec<ModuleVersionIdentifier>> {
        let mut paths = Vec::new();
        let mut stack = vec![vec![node]];
        while let Some(path) = stack.pop() {
            let Some(&head) = path.last() else { continue };
            if head == self.root {
                let mut modules: Vec<ModuleVersionIdentifier> = path
                    .iter()
                    .rev()
                    .map(|&n| self.graph[n].identifier.module.clone())
                    .collect();
                modules.dedup();
                paths.push(modules);
                continue;
            }
            let mut parents: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(head, Direction::Incoming)
                .filter(|parent| !path.contains(parent))
                .collect();
            parents.sort_unstable();
            parents.dedup();
            for parent in parents.into_iter().rev() {
                let mut next = path.clone();
                next.push(parent);
                stack.push(next);
            }
        }
        paths
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> NodeIndex {
        self.root
    }

    /// The underlying graph.
    #[must_use]
    pub const fn graph(&self) -> &DiGraph<DependencyGraphNode, DependencyGraphEdge> {
        &self.graph
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, node: NodeIndex) -> Option<&DependencyGraphNode> {
        self.graph.node_weight(node)
    }

    /// Find the node for a module configuration.
    #[must_use]
    pub fn find(&self, identifier: &ResolvedConfigurationIdentifier) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&n| self.graph[n].identifier == *identifier)
    }

    /// Number of nodes including the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Version selected for `module`, if it is part of the graph.
    #[must_use]
    pub fn selected_version(&self, module: &ModuleIdentifier) -> Option<&str> {
        self.graph
            .node_weights()
            .skip(1)
            .find(|n| n.identifier.module.module() == *module)
            .map(|n| n.identifier.module.version.as_str())
    }

    /// Every module version in the graph, excluding the root, each once.
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleVersionIdentifier> {
        let unique: IndexSet<&ModuleVersionIdentifier> = self
            .graph
            .node_weights()
            .skip(1)
            .map(|n| &n.identifier.module)
            .collect();
        unique.into_iter().cloned().collect()
    }

    /// Dependencies declared directly by the root.
    #[must_use]
    pub fn first_level(&self) -> &[FirstLevelDependency] {
        &self.first_level
    }

    /// Children of `node` with the declaration followed to each, in
    /// declaration order.
    #[must_use]
    pub fn children(&self, node: NodeIndex) -> Vec<(NodeIndex, &DependencyGraphEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| (e.target(), e.weight())).collect()
    }

    /// Dependencies that could not be resolved, one per requested selector.
    #[must_use]
    pub fn failures(&self) -> &[UnresolvedDependency] {
        &self.failures
    }
}
