//! Module, configuration and artifact identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A module without a version: `group:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleIdentifier {
    /// Module group, e.g. `org.example`.
    pub group: String,
    /// Module name.
    pub name: String,
}

impl ModuleIdentifier {
    /// Create a module identifier.
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// A concrete module version: `group:name:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersionIdentifier {
    /// Module group.
    pub group: String,
    /// Module name.
    pub name: String,
    /// Resolved version.
    pub version: String,
}

impl ModuleVersionIdentifier {
    /// Create a module version identifier.
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
        }
    }

    /// The versionless module this version belongs to.
    #[must_use]
    pub fn module(&self) -> ModuleIdentifier {
        ModuleIdentifier::new(&self.group, &self.name)
    }
}

impl fmt::Display for ModuleVersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// A requested module version. Identical in shape to [`ModuleVersionIdentifier`]
/// but describes what was asked for rather than what was selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleVersionSelector {
    /// Requested group.
    pub group: String,
    /// Requested name.
    pub name: String,
    /// Requested version.
    pub version: String,
}

impl ModuleVersionSelector {
    /// Create a selector.
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
        }
    }

    /// The module being selected.
    #[must_use]
    pub fn module(&self) -> ModuleIdentifier {
        ModuleIdentifier::new(&self.group, &self.name)
    }

    /// The identifier this selector resolves to when taken literally.
    #[must_use]
    pub fn to_identifier(&self) -> ModuleVersionIdentifier {
        ModuleVersionIdentifier::new(&self.group, &self.name, &self.version)
    }
}

impl fmt::Display for ModuleVersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl From<ModuleVersionIdentifier> for ModuleVersionSelector {
    fn from(id: ModuleVersionIdentifier) -> Self {
        Self {
            group: id.group,
            name: id.name,
            version: id.version,
        }
    }
}

/// Identifies one configuration of one resolved module. This is the identity of a
/// node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedConfigurationIdentifier {
    /// The resolved module.
    pub module: ModuleVersionIdentifier,
    /// Configuration name within the module.
    pub configuration: String,
}

impl ResolvedConfigurationIdentifier {
    /// Create a resolved configuration identifier.
    #[must_use]
    pub fn new(module: ModuleVersionIdentifier, configuration: impl Into<String>) -> Self {
        Self {
            module,
            configuration: configuration.into(),
        }
    }
}

impl fmt::Display for ResolvedConfigurationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.module, self.configuration)
    }
}

/// Name, extension and optional classifier of an artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactName {
    /// Base name, usually the module name.
    pub name: String,
    /// File extension without the dot.
    pub extension: String,
    /// Optional classifier, e.g. `sources`.
    pub classifier: Option<String>,
}

impl ArtifactName {
    /// Create an artifact name.
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
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(f, "{}-{}.{}", self.name, classifier, self.extension),
            None => write!(f, "{}.{}", self.name, self.extension),
        }
    }
}

/// Identifies an artifact of a specific module version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentArtifactIdentifier {
    /// Owning module version.
    pub component: ModuleVersionIdentifier,
    /// Artifact name.
    pub artifact: ArtifactName,
}

impl ComponentArtifactIdentifier {
    /// Create a component artifact identifier.
    #[must_use]
    pub const fn new(component: ModuleVersionIdentifier, artifact: ArtifactName) -> Self {
        Self {
            component,
            artifact,
        }
    }

    /// File name as laid out in a Maven repository: `name-version[-classifier].ext`.
    #[must_use]
    pub fn file_name(&self) -> String {
        match &self.artifact.classifier {
            Some(classifier) => format!(
                "{}-{}-{}.{}",
                self.artifact.name, self.component.version, classifier, self.artifact.extension
            ),
            None => format!(
                "{}-{}.{}",
                self.artifact.name, self.component.version, self.artifact.extension
            ),
        }
    }

    /// Human readable name, `file (group:name:version)`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.file_name(), self.component)
    }
}

impl fmt::Display for ComponentArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        let id = ModuleVersionIdentifier::new("org.example", "lib", "1.2");
        assert_eq!(id.to_string(), "org.example:lib:1.2");
        assert_eq!(id.module().to_string(), "org.example:lib");

        let node = ResolvedConfigurationIdentifier::new(id, "runtime");
        assert_eq!(node.to_string(), "org.example:lib:1.2;runtime");
    }

    #[test]
    fn test_artifact_file_name_with_classifier() {
        let artifact = ComponentArtifactIdentifier::new(
            ModuleVersionIdentifier::new("org", "lib", "2.0"),
            ArtifactName::new("lib", "jar", Some("sources".to_string())),
        );
        assert_eq!(artifact.file_name(), "lib-2.0-sources.jar");
        assert_eq!(artifact.display_name(), "lib-2.0-sources.jar (org:lib:2.0)");
    }

    #[test]
    fn test_selector_converts_to_identifier() {
        let selector = ModuleVersionSelector::new("g", "n", "1");
        assert_eq!(
            selector.to_identifier(),
            ModuleVersionIdentifier::new("g", "n", "1")
        );
        let back: ModuleVersionSelector = selector.to_identifier().into();
        assert_eq!(back, selector);
    }
}
