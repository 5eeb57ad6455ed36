//! Dependency graph resolution for depot.
//!
//! [`DependencyGraphBuilder`] turns a configuration into a graph of module
//! configurations, settling version conflicts and collecting unresolvable
//! dependencies with the paths that requested them.
//! [`ArtifactResolutionCoordinator`] binds an artifact set to every edge, and
//! [`DefaultConfigurationResolver`] wires both into the configuration
//! lifecycle, streaming each graph through a transient result log.

pub mod artifacts;
pub mod builder;
pub mod error;
pub mod metadata;
pub mod resolver;

pub use artifacts::{
    ArtifactResolutionCoordinator, ArtifactResolver, ArtifactSet, BoxError, ResolvedArtifact,
};
pub use builder::{
    DependencyGraph, DependencyGraphBuilder, DependencyGraphEdge, DependencyGraphNode,
    FirstLevelDependency, RootConfiguration,
};
pub use depot_configurations::UnresolvedDependency;
pub use error::{Error, ModuleVersionResolveError, Result};
pub use metadata::{ConfigurationMetadata, InMemoryModuleSource, ModuleMetadata, ModuleMetadataSource};
pub use resolver::{DefaultConfigurationResolver, DefaultResolvedConfiguration};
