//! Event type definitions for structured depot events.
//!
//! Events are grouped by the subsystem that produced them: dependency resolution,
//! publication and artifact verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structured depot event with its capture metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotEvent {
    /// When the event was captured.
    pub timestamp: DateTime<Utc>,
    /// The tracing target (e.g. `depot::resolve`).
    pub target: String,
    /// The event category and data.
    pub category: EventCategory,
}

impl DepotEvent {
    /// Create a new event captured now.
    #[must_use]
    pub fn new(target: impl Into<String>, category: EventCategory) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.into(),
            category,
        }
    }
}

/// Event categories organized by subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EventCategory {
    /// Configuration resolution lifecycle.
    Resolution(ResolutionEvent),
    /// Publication lifecycle.
    Publish(PublishEvent),
    /// Artifact verification.
    Verification(VerificationEvent),
}

/// Configuration resolution lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ResolutionEvent {
    /// Resolution of a configuration started.
    Started {
        /// Configuration path, e.g. `:app:runtime`.
        configuration: String,
    },
    /// A dependency could not be resolved.
    Failure {
        /// Configuration path.
        configuration: String,
        /// Requested `group:name:version`.
        selector: String,
        /// Failure description.
        error: String,
    },
    /// An artifact file was materialized.
    ArtifactResolved {
        /// Artifact display name.
        artifact: String,
    },
    /// Resolution of a configuration finished.
    Completed {
        /// Configuration path.
        configuration: String,
        /// Number of nodes in the resolved graph.
        nodes: u64,
        /// Number of unresolved dependencies.
        failures: u64,
    },
}

/// Publication lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PublishEvent {
    /// Publishing a module to a repository started.
    Started {
        /// Published `group:artifact:version`.
        module: String,
        /// Target repository name.
        repository: String,
    },
    /// A single resource was uploaded.
    Uploaded {
        /// Resource path relative to the repository root.
        resource: String,
    },
    /// Publishing finished.
    Completed {
        /// Published `group:artifact:version`.
        module: String,
        /// Target repository name.
        repository: String,
    },
}

/// Verification events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum VerificationEvent {
    /// Verification of a configuration reported failures.
    Failed {
        /// Display name of what was being verified.
        subject: String,
        /// Number of artifacts with at least one failure.
        count: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_category_serializes_with_type_tag() {
        let category = EventCategory::Resolution(ResolutionEvent::Started {
            configuration: ":compile".to_string(),
        });
        let json = serde_json::to_value(&category).unwrap();
        assert_eq!(json["type"], "Resolution");
        assert_eq!(json["data"]["event"], "Started");
        assert_eq!(json["data"]["data"]["configuration"], ":compile");
    }

    #[test]
    fn test_event_roundtrip() {
        let event = DepotEvent::new(
            "depot::publish",
            EventCategory::Publish(PublishEvent::Uploaded {
                resource: "org/foo/1.0/foo-1.0.jar".to_string(),
            }),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: DepotEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.category, event.category);
        assert_eq!(back.target, "depot::publish");
    }
}
