//! Dependency configurations for depot.
//!
//! A configuration is a named bucket of declared dependencies, published
//! artifacts and exclude rules. Configurations extend one another to form a
//! DAG, are resolved exactly once through a [`ConfigurationResolver`], and
//! reject every mutation afterwards.

pub mod configuration;
pub mod container;
pub mod error;
pub mod files;
pub mod resolved;

pub use configuration::{Configuration, PublishArtifact, State};
pub use container::ConfigurationContainer;
pub use error::{Error, Result};
pub use files::ArtifactFileCollection;
pub use resolved::{ConfigurationResolver, ResolvedConfiguration, UnresolvedDependency};
