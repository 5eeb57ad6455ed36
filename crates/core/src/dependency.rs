//! Declared module dependencies.

use crate::exclude::ExcludeRule;
use crate::identifier::{ArtifactName, ModuleIdentifier, ModuleVersionSelector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration of the target module used when a dependency names none.
pub const DEFAULT_CONFIGURATION: &str = "default";

/// An artifact explicitly requested by a dependency, e.g. `lib:sources@jar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyArtifact {
    /// Artifact base name.
    pub name: String,
    /// File extension.
    pub extension: String,
    /// Optional classifier.
    pub classifier: Option<String>,
}

impl DependencyArtifact {
    /// Create a dependency artifact.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        extension: impl Into<String>,
        classifier: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            extension: extension.into(),
            classifier,
        }
    }

    /// The artifact name this request resolves to.
    #[must_use]
    pub fn to_artifact_name(&self) -> ArtifactName {
        ArtifactName::new(&self.name, &self.extension, self.classifier.clone())
    }
}

/// Restricts which artifacts of the target configuration an edge receives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactSelector {
    /// Every artifact of the target configuration.
    #[default]
    All,
    /// Only artifacts matching the filter.
    Matching(ArtifactFilter),
}

impl ArtifactSelector {
    /// Whether the selector imposes no filter.
    #[must_use]
    pub const fn accepts_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether `artifact` passes the selector.
    #[must_use]
    pub fn accepts(&self, artifact: &ArtifactName) -> bool {
        match self {
            Self::All => true,
            Self::Matching(filter) => filter.accepts(artifact),
        }
    }
}

/// Matches artifacts by extension and classifier. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactFilter {
    /// Required extension.
    pub extension: Option<String>,
    /// Required classifier.
    pub classifier: Option<String>,
}

impl ArtifactFilter {
    /// Whether `artifact` matches.
    #[must_use]
    pub fn accepts(&self, artifact: &ArtifactName) -> bool {
        self.extension
            .as_ref()
            .is_none_or(|e| *e == artifact.extension)
            && self
                .classifier
                .as_ref()
                .is_none_or(|c| artifact.classifier.as_ref() == Some(c))
    }
}

/// A dependency on an external module declared in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleDependency {
    /// Requested group.
    pub group: String,
    /// Requested name.
    pub name: String,
    /// Requested version.
    pub version: String,
    /// Configuration of the target module, [`DEFAULT_CONFIGURATION`] when absent.
    pub target_configuration: Option<String>,
    /// Whether the target's own dependencies are followed.
    pub transitive: bool,
    /// Whether this version wins any conflict.
    pub force: bool,
    /// Modules excluded below this dependency.
    pub excludes: Vec<ExcludeRule>,
    /// Explicitly requested artifacts.
    pub artifacts: Vec<DependencyArtifact>,
    /// Filter over the target configuration's artifacts.
    pub artifact_selector: ArtifactSelector,
}

impl ModuleDependency {
    /// A transitive dependency on `group:name:version`.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            target_configuration: None,
            transitive: true,
            force: false,
            excludes: Vec::new(),
            artifacts: Vec::new(),
            artifact_selector: ArtifactSelector::All,
        }
    }

    /// Target a specific configuration of the module.
    #[must_use]
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.target_configuration = Some(configuration.into());
        self
    }

    /// Set transitivity.
    #[must_use]
    pub const fn with_transitive(mut self, transitive: bool) -> Self {
        self.transitive = transitive;
        self
    }

    /// Mark the version as forced.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Add an exclude rule.
    #[must_use]
    pub fn exclude(mut self, rule: ExcludeRule) -> Self {
        self.excludes.push(rule);
        self
    }

    /// Request an explicit artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: DependencyArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Filter the target configuration's artifacts.
    #[must_use]
    pub fn with_selector(mut self, selector: ArtifactSelector) -> Self {
        self.artifact_selector = selector;
        self
    }

    /// The configuration this dependency points at.
    #[must_use]
    pub fn target_configuration(&self) -> &str {
        self.target_configuration
            .as_deref()
            .unwrap_or(DEFAULT_CONFIGURATION)
    }

    /// The requested module.
    #[must_use]
    pub fn module(&self) -> ModuleIdentifier {
        ModuleIdentifier::new(&self.group, &self.name)
    }

    /// The requested module version.
    #[must_use]
    pub fn selector(&self) -> ModuleVersionSelector {
        ModuleVersionSelector::new(&self.group, &self.name, &self.version)
    }

    /// Whether the dependency receives every artifact of its target unfiltered.
    #[must_use]
    pub fn accepts_all_artifacts(&self) -> bool {
        self.artifacts.is_empty() && self.artifact_selector.accepts_all()
    }

    /// An independent copy of this dependency.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl fmt::Display for ModuleDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}
