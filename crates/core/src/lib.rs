//! Core model for depot.
//!
//! Identifiers, version ordering and conflict policies, forced-version
//! notations, declared dependencies and exclude rules, settings, caller-owned
//! problem reporting and the file tree event pipeline. Every other depot crate
//! builds on these types.

pub mod conflict;
pub mod dependency;
pub mod error;
pub mod exclude;
pub mod identifier;
pub mod notation;
pub mod problems;
pub mod settings;
pub mod strategy;
pub mod tree;
pub mod version;

pub use conflict::ConflictResolution;
pub use dependency::{
    ArtifactFilter, ArtifactSelector, DEFAULT_CONFIGURATION, DependencyArtifact, ModuleDependency,
};
pub use error::{Error, Result};
pub use exclude::ExcludeRule;
pub use identifier::{
    ArtifactName, ComponentArtifactIdentifier, ModuleIdentifier, ModuleVersionIdentifier,
    ModuleVersionSelector, ResolvedConfigurationIdentifier,
};
pub use notation::NotationInput;
pub use problems::{OperationId, Problem, ProblemArena, ProblemLocation, Severity};
pub use settings::{ConsoleMode, RetryConfig, Settings};
pub use strategy::ResolutionStrategy;
pub use tree::{FileTreeEvent, Pipeline};
pub use version::Version;
