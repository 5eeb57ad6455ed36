//! In-memory view of a replayed result log.

use depot_core::ResolvedConfigurationIdentifier;
use std::collections::BTreeMap;

/// A node of the replayed graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultNode {
    /// Node id as written to the log.
    pub id: u64,
    /// Module and configuration this node stands for.
    pub identifier: ResolvedConfigurationIdentifier,
    /// Child ids in edge order.
    pub children: Vec<u64>,
    /// Parent ids in edge order.
    pub parents: Vec<u64>,
}

/// A parent-child edge and the artifact set bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultEdge {
    /// Parent node id.
    pub parent: u64,
    /// Child node id.
    pub child: u64,
    /// Artifact set the child contributes through this edge.
    pub artifact_set_id: u64,
}

/// The graph rebuilt from a result log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientConfigurationResults {
    root: u64,
    nodes: BTreeMap<u64, ResultNode>,
    first_level: Vec<u64>,
    edges: Vec<ResultEdge>,
    // Positions in `edges`, keyed by parent id.
    outgoing: BTreeMap<u64, Vec<usize>>,
}

impl TransientConfigurationResults {
    pub(crate) fn new(
        root: u64,
        nodes: BTreeMap<u64, ResultNode>,
        first_level: Vec<u64>,
        edges: Vec<ResultEdge>,
    ) -> Self {
        let mut outgoing: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (index, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.parent).or_default().push(index);
        }
        Self {
            root,
            nodes,
            first_level,
            edges,
            outgoing,
        }
    }

    /// Id of the root node.
    #[must_use]
    pub const fn root_id(&self) -> u64 {
        self.root
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Option<&ResultNode> {
        self.nodes.get(&self.root)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: u64) -> Option<&ResultNode> {
        self.nodes.get(&id)
    }

    /// Every node ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &ResultNode> {
        self.nodes.values()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of the first-level dependencies in the order they were recorded.
    #[must_use]
    pub fn first_level_ids(&self) -> &[u64] {
        &self.first_level
    }

    /// First-level dependency nodes.
    pub fn first_level(&self) -> impl Iterator<Item = &ResultNode> {
        self.first_level.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Whether `id` was recorded as a first-level dependency.
    #[must_use]
    pub fn is_first_level(&self, id: u64) -> bool {
        self.first_level.contains(&id)
    }

    /// Every edge in log order.
    #[must_use]
    pub fn edges(&self) -> &[ResultEdge] {
        &self.edges
    }

    /// Edges leaving `parent`, in log order.
    pub fn outgoing_edges(&self, parent: u64) -> impl Iterator<Item = &ResultEdge> {
        self.outgoing
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|index| self.edges.get(*index))
    }

    /// Artifact set bound to the edge `parent -> child`.
    #[must_use]
    pub fn artifact_set_id(&self, parent: u64, child: u64) -> Option<u64> {
        self.outgoing_edges(parent)
            .find(|e| e.child == child)
            .map(|e| e.artifact_set_id)
    }

    /// Artifact sets bound to edges into `child`.
    #[must_use]
    pub fn incoming_artifact_sets(&self, child: u64) -> Vec<u64> {
        self.edges
            .iter()
            .filter(|e| e.child == child)
            .map(|e| e.artifact_set_id)
            .collect()
    }
}
