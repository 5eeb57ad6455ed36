//! `maven-metadata.xml` model and merging.

use crate::error::{Error, Result};
use crate::snapshot::SnapshotVersion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Module-level metadata file name.
pub const METADATA_FILE: &str = "maven-metadata.xml";

/// Metadata file name used by local repositories.
pub const LOCAL_METADATA_FILE: &str = "maven-metadata-local.xml";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// A `maven-metadata.xml` document, module or snapshot level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "metadata")]
pub struct MavenMetadata {
    /// Metadata model version attribute.
    #[serde(rename = "@modelVersion", default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Group id.
    #[serde(rename = "groupId", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Artifact id.
    #[serde(rename = "artifactId", default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Version, present in snapshot-level metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Versioning block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
}

/// The `<versioning>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioning {
    /// Latest published version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    /// Latest non-snapshot version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    /// Snapshot block of snapshot-level metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    /// Every published version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Versions>,
    /// `yyyyMMddHHmmss` of the last update.
    #[serde(rename = "lastUpdated", default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// Per-file snapshot versions.
    #[serde(rename = "snapshotVersions", default, skip_serializing_if = "Option::is_none")]
    pub snapshot_versions: Option<SnapshotVersions>,
}

/// The `<snapshot>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// `yyyyMMdd.HHmmss` of the upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Build number of the upload.
    #[serde(rename = "buildNumber", default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<u32>,
    /// Set by local repositories, which keep literal `-SNAPSHOT` files.
    #[serde(rename = "localCopy", default, skip_serializing_if = "Option::is_none")]
    pub local_copy: Option<bool>,
}

/// The `<versions>` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    /// Versions in publish order.
    #[serde(rename = "version", default)]
    pub version: Vec<String>,
}

/// The `<snapshotVersions>` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotVersions {
    /// One entry per extension and classifier.
    #[serde(rename = "snapshotVersion", default)]
    pub snapshot_version: Vec<SnapshotFileVersion>,
}

/// A `<snapshotVersion>` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFileVersion {
    /// Classifier, absent for the main artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    /// Extension.
    pub extension: String,
    /// Timestamped version of the file.
    pub value: String,
    /// `yyyyMMddHHmmss` of the upload.
    pub updated: String,
}

/// `yyyyMMddHHmmss` rendering of `now`.
#[must_use]
pub fn last_updated(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

impl MavenMetadata {
    /// Parse metadata read from `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] when the document is not valid metadata.
    pub fn parse(resource: &str, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::metadata(resource, e.to_string()))?;
        quick_xml::de::from_str(text).map_err(|e| Error::metadata(resource, e.to_string()))
    }

    /// Render the document with an XML declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Metadata`] if serialization fails.
    pub fn to_xml(&self, resource: &str) -> Result<String> {
        let body = quick_xml::se::to_string(self).map_err(|e| Error::metadata(resource, e.to_string()))?;
        Ok(format!("{XML_DECLARATION}{body}\n"))
    }

    /// Build number recorded in the snapshot block.
    #[must_use]
    pub fn snapshot_build_number(&self) -> Option<u32> {
        self.versioning
            .as_ref()?
            .snapshot
            .as_ref()?
            .build_number
    }

    fn versioning_mut(&mut self) -> &mut Versioning {
        self.versioning.get_or_insert_with(Versioning::default)
    }

    /// Merge a newly published `version` into module-level metadata.
    pub fn add_version(
        &mut self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        is_snapshot: bool,
        now: DateTime<Utc>,
    ) {
        self.group_id = Some(group_id.to_string());
        self.artifact_id = Some(artifact_id.to_string());
        let versioning = self.versioning_mut();
        let versions = versioning.versions.get_or_insert_with(Versions::default);
        if !versions.version.iter().any(|v| v == version) {
            versions.version.push(version.to_string());
        }
        versioning.latest = Some(version.to_string());
        if !is_snapshot {
            versioning.release = Some(version.to_string());
        }
        versioning.last_updated = Some(last_updated(now));
    }

    /// Record a remote snapshot upload in snapshot-level metadata.
    pub fn set_snapshot(&mut self, snapshot: &SnapshotVersion, now: DateTime<Utc>) {
        let versioning = self.versioning_mut();
        versioning.snapshot = Some(Snapshot {
            timestamp: Some(snapshot.timestamp.clone()),
            build_number: Some(snapshot.build_number),
            local_copy: None,
        });
        versioning.last_updated = Some(last_updated(now));
    }

    /// Mark snapshot-level metadata as a local copy.
    pub fn set_local_copy(&mut self, now: DateTime<Utc>) {
        let versioning = self.versioning_mut();
        versioning.snapshot = Some(Snapshot {
            timestamp: None,
            build_number: None,
            local_copy: Some(true),
        });
        versioning.last_updated = Some(last_updated(now));
    }

    /// Insert or replace the snapshot version of the file with `extension`
    /// and `classifier`.
    pub fn add_snapshot_file(
        &mut self,
        extension: &str,
        classifier: Option<&str>,
        value: &str,
        now: DateTime<Utc>,
    ) {
        let entries = &mut self
            .versioning_mut()
            .snapshot_versions
            .get_or_insert_with(SnapshotVersions::default)
            .snapshot_version;
        let entry = SnapshotFileVersion {
            classifier: classifier.map(str::to_string),
            extension: extension.to_string(),
            value: value.to_string(),
            updated: last_updated(now),
        };
        match entries
            .iter_mut()
            .find(|e| e.extension == extension && e.classifier.as_deref() == classifier)
        {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}
