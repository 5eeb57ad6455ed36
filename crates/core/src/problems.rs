//! Problem reports collected during an operation.
//!
//! A [`ProblemArena`] is owned by the caller: created when an operation starts,
//! passed to whatever records problems, read when the operation ends and then
//! dropped. Problems are grouped by [`OperationId`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a problem was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProblemLocation {
    /// A file, optionally narrowed to a line and column.
    File {
        /// File path as given.
        path: String,
        /// 1-based line.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        /// 1-based column.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
    },
    /// A plugin, by id.
    PluginId {
        /// Plugin id.
        id: String,
    },
    /// A task, by path.
    Task {
        /// Task path, e.g. `:app:publish`.
        path: String,
    },
}

impl fmt::Display for ProblemLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File {
                path,
                line: Some(line),
                column: Some(column),
            } => write!(f, "{path}:{line}:{column}"),
            Self::File {
                path,
                line: Some(line),
                column: None,
            } => write!(f, "{path}:{line}"),
            Self::File { path, .. } => f.write_str(path),
            Self::PluginId { id } => write!(f, "plugin '{id}'"),
            Self::Task { path } => write!(f, "task '{path}'"),
        }
    }
}

/// Problem severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, does not fail the operation.
    Warning,
    /// Fails the operation.
    Error,
}

/// A single problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Stable problem id, e.g. `publication.duplicate-artifact`.
    pub id: String,
    /// Severity.
    pub severity: Severity,
    /// One line description.
    pub message: String,
    /// Optional longer explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Where it happened.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ProblemLocation>,
}

impl Problem {
    /// An error problem.
    #[must_use]
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity: Severity::Error,
            message: message.into(),
            details: None,
            locations: Vec::new(),
        }
    }

    /// A warning problem.
    #[must_use]
    pub fn warning(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(id, message)
        }
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach a location.
    #[must_use]
    pub fn at(mut self, location: ProblemLocation) -> Self {
        self.locations.push(location);
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for location in &self.locations {
            write!(f, " ({location})")?;
        }
        Ok(())
    }
}

/// Identifies one operation within an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationId(u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Caller-owned store of problems keyed by operation.
#[derive(Debug, Default)]
pub struct ProblemArena {
    next_id: u64,
    problems: IndexMap<OperationId, Vec<Problem>>,
}

#[derive(Serialize)]
struct ProblemReport<'a> {
    operation: OperationId,
    problems: &'a [Problem],
}

impl ProblemArena {
    /// An empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a new operation.
    pub fn begin_operation(&mut self) -> OperationId {
        self.next_id += 1;
        let id = OperationId(self.next_id);
        self.problems.insert(id, Vec::new());
        id
    }

    /// Record a problem against `operation`.
    pub fn record(&mut self, operation: OperationId, problem: Problem) {
        tracing::debug!(%operation, id = %problem.id, "Recorded problem");
        self.problems.entry(operation).or_default().push(problem);
    }

    /// Problems recorded for `operation`, in recording order.
    #[must_use]
    pub fn problems(&self, operation: OperationId) -> &[Problem] {
        self.problems.get(&operation).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether `operation` recorded any error.
    #[must_use]
    pub fn has_errors(&self, operation: OperationId) -> bool {
        self.problems(operation)
            .iter()
            .any(|p| p.severity == Severity::Error)
    }

    /// End tracking of `operation`, returning its problems.
    pub fn finish(&mut self, operation: OperationId) -> Vec<Problem> {
        self.problems.shift_remove(&operation).unwrap_or_default()
    }

    /// JSON report of the problems recorded for `operation`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn report_json(&self, operation: OperationId) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ProblemReport {
            operation,
            problems: self.problems(operation),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_location_uses_type_discriminator() {
        let location = ProblemLocation::Task {
            path: ":app:publish".to_string(),
        };
        let value = serde_json::to_value(&location).unwrap();
        assert_eq!(value, json!({"type": "Task", "path": ":app:publish"}));

        let back: ProblemLocation =
            serde_json::from_value(json!({"type": "PluginId", "id": "maven-publish"})).unwrap();
        assert_eq!(
            back,
            ProblemLocation::PluginId {
                id: "maven-publish".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_location_type_rejected() {
        let result: Result<ProblemLocation, _> =
            serde_json::from_value(json!({"type": "Project", "path": ":"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_location_display() {
        let location = ProblemLocation::File {
            path: "pom.xml".to_string(),
            line: Some(3),
            column: None,
        };
        assert_eq!(location.to_string(), "pom.xml:3");
    }

    #[test]
    fn test_arena_isolates_operations() {
        let mut arena = ProblemArena::new();
        let first = arena.begin_operation();
        let second = arena.begin_operation();
        arena.record(first, Problem::error("a", "broken"));
        arena.record(second, Problem::warning("b", "odd"));

        assert!(arena.has_errors(first));
        assert!(!arena.has_errors(second));
        assert_eq!(arena.finish(first).len(), 1);
        assert!(arena.problems(first).is_empty());
        assert_eq!(arena.problems(second).len(), 1);
    }

    #[test]
    fn test_report_json() {
        let mut arena = ProblemArena::new();
        let op = arena.begin_operation();
        arena.record(
            op,
            Problem::error("publication.invalid-file", "missing file").at(ProblemLocation::File {
                path: "lib.jar".to_string(),
                line: None,
                column: None,
            }),
        );
        let report: Value = serde_json::from_str(&arena.report_json(op).unwrap()).unwrap();
        assert_eq!(report["problems"][0]["severity"], "error");
        assert_eq!(report["problems"][0]["locations"][0]["type"], "File");
        assert_eq!(report["problems"][0]["locations"][0]["path"], "lib.jar");
    }
}
