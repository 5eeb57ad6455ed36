//! The Maven publication model and pre-publish validation.

use crate::error::{Error, Result};
use depot_core::{OperationId, Problem, ProblemArena, ProblemLocation, Severity};
use regex::Regex;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static FILESYSTEM_SAFE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^[^\\/:*?"<>|\x00-\x1F]*$"#).ok());

/// One file of a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenArtifact {
    /// File to upload.
    pub file: PathBuf,
    /// Extension without the dot.
    pub extension: String,
    /// Optional classifier.
    pub classifier: Option<String>,
}

impl MavenArtifact {
    /// An artifact without classifier.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            extension: extension.into(),
            classifier: None,
        }
    }

    /// Set the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Repository file name for `artifact_id` at `version`.
    #[must_use]
    pub fn file_name(&self, artifact_id: &str, version: &str) -> String {
        let mut name = format!("{artifact_id}-{version}");
        if let Some(classifier) = &self.classifier {
            name.push('-');
            name.push_str(classifier);
        }
        if !self.extension.is_empty() {
            name.push('.');
            name.push_str(&self.extension);
        }
        name
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())?;
        match &self.classifier {
            Some(classifier) => write!(f, " (extension '{}', classifier '{classifier}')", self.extension),
            None => write!(f, " (extension '{}')", self.extension),
        }
    }
}

/// A normalized Maven publication: coordinates, POM file, main artifact and
/// additional artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenPublication {
    /// Publication name used in messages, e.g. `maven`.
    pub name: String,
    /// Group id.
    pub group_id: String,
    /// Artifact id.
    pub artifact_id: String,
    /// Version, possibly a snapshot.
    pub version: String,
    /// The generated POM file.
    pub pom: PathBuf,
    /// Main artifact, absent for POM-only publications.
    pub main_artifact: Option<MavenArtifact>,
    /// Additional artifacts.
    pub artifacts: Vec<MavenArtifact>,
}

impl MavenPublication {
    /// A POM-only publication.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        pom: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            pom: pom.into(),
            main_artifact: None,
            artifacts: Vec::new(),
        }
    }

    /// Set the main artifact.
    #[must_use]
    pub fn with_main_artifact(mut self, artifact: MavenArtifact) -> Self {
        self.main_artifact = Some(artifact);
        self
    }

    /// Add an additional artifact.
    #[must_use]
    pub fn with_artifact(mut self, artifact: MavenArtifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Main artifact followed by the additional artifacts.
    pub fn all_artifacts(&self) -> impl Iterator<Item = &MavenArtifact> {
        self.main_artifact.iter().chain(&self.artifacts)
    }

    /// `group:artifact:version`.
    #[must_use]
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Record every problem with this publication against `operation` and fail
    /// if any of them is an error. Performs no network I/O.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPublication`] listing every error problem.
    pub fn validate(&self, arena: &mut ProblemArena, operation: OperationId) -> Result<()> {
        self.check_pom(arena, operation);
        self.check_artifacts(arena, operation);

        if !arena.has_errors(operation) {
            return Ok(());
        }
        let message = arena
            .problems(operation)
            .iter()
            .filter(|p| p.severity == Severity::Error)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Err(Error::invalid_publication(&self.name, message))
    }

    fn check_pom(&self, arena: &mut ProblemArena, operation: OperationId) {
        let location = file_location(&self.pom);
        let pom = match read_pom(&self.pom) {
            Ok(pom) => pom,
            Err(message) => {
                arena.record(
                    operation,
                    Problem::error("publication.invalid-pom", format!("POM file is unreadable: {message}"))
                        .at(location),
                );
                return;
            }
        };
        if pom.parent.is_some() {
            return;
        }

        let declared = [
            ("groupId", pom.group_id.as_deref(), self.group_id.as_str()),
            ("artifactId", pom.artifact_id.as_deref(), self.artifact_id.as_str()),
            ("version", pom.version.as_deref(), self.version.as_str()),
        ];
        for (element, found, expected) in declared {
            if found.map(str::trim) != Some(expected) {
                arena.record(
                    operation,
                    Problem::error(
                        "publication.coordinates-mismatch",
                        format!(
                            "supplied {element} '{expected}' does not match POM file (cannot edit {element} directly in the POM file)"
                        ),
                    )
                    .with_details(format!("POM declares {}", found.unwrap_or("nothing")))
                    .at(location.clone()),
                );
            }
        }
    }

    fn check_artifacts(&self, arena: &mut ProblemArena, operation: OperationId) {
        let mut seen = HashSet::new();
        for artifact in self.all_artifacts() {
            let location = file_location(&artifact.file);
            if !is_filesystem_safe(&artifact.extension) {
                arena.record(
                    operation,
                    Problem::error(
                        "publication.unsafe-extension",
                        format!("artifact extension '{}' is not a valid file name part", artifact.extension),
                    )
                    .at(location.clone()),
                );
            }
            let unsafe_classifier = artifact
                .classifier
                .as_deref()
                .filter(|c| c.is_empty() || !is_filesystem_safe(c));
            if let Some(classifier) = unsafe_classifier {
                arena.record(
                    operation,
                    Problem::error(
                        "publication.unsafe-classifier",
                        format!("artifact classifier '{classifier}' is not a valid file name part"),
                    )
                    .at(location.clone()),
                );
            }
            if !seen.insert((artifact.extension.as_str(), artifact.classifier.as_deref())) {
                arena.record(
                    operation,
                    Problem::error(
                        "publication.duplicate-artifact",
                        format!(
                            "multiple artifacts with the identical extension and classifier ('{}', '{}')",
                            artifact.extension,
                            artifact.classifier.as_deref().unwrap_or("null")
                        ),
                    )
                    .at(location.clone()),
                );
            }
            if !artifact.file.exists() {
                arena.record(
                    operation,
                    Problem::error(
                        "publication.missing-file",
                        format!("artifact file does not exist: '{}'", artifact.file.display()),
                    )
                    .at(location),
                );
            } else if artifact.file.is_dir() {
                arena.record(
                    operation,
                    Problem::error(
                        "publication.directory-artifact",
                        format!("artifact file is a directory: '{}'", artifact.file.display()),
                    )
                    .at(location),
                );
            }
        }
    }
}

fn is_filesystem_safe(part: &str) -> bool {
    part != "."
        && part != ".."
        && FILESYSTEM_SAFE
            .as_ref()
            .is_some_and(|regex| regex.is_match(part))
}

fn file_location(path: &Path) -> ProblemLocation {
    ProblemLocation::File {
        path: path.display().to_string(),
        line: None,
        column: None,
    }
}

#[derive(Debug, Deserialize)]
struct PomCoordinates {
    #[serde(rename = "groupId")]
    group_id: Option<String>,
    #[serde(rename = "artifactId")]
    artifact_id: Option<String>,
    version: Option<String>,
    parent: Option<IgnoredAny>,
}

fn read_pom(path: &Path) -> std::result::Result<PomCoordinates, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    quick_xml::de::from_str(&text).map_err(|e| e.to_string())
}
