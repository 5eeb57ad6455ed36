//! Conflict resolution policies.

use crate::error::{Error, Result};
use crate::identifier::ModuleIdentifier;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How to pick one version when a module is requested in several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Newest version wins, see [`crate::version`] for the ordering.
    #[default]
    Latest,
    /// Any disagreement between requested versions is an error.
    Strict,
}

impl ConflictResolution {
    /// Select the winning version among `candidates`.
    ///
    /// Duplicate candidates are not a conflict. With [`Self::Strict`] two or more
    /// distinct versions fail with [`Error::VersionConflict`].
    ///
    /// # Errors
    ///
    /// Returns an error when `candidates` is empty or when the strict policy
    /// finds more than one distinct version.
    pub fn select(self, module: &ModuleIdentifier, candidates: &[String]) -> Result<String> {
        let mut distinct: Vec<&String> = Vec::new();
        for candidate in candidates {
            if !distinct.contains(&candidate) {
                distinct.push(candidate);
            }
        }

        match (self, distinct.as_slice()) {
            (_, []) => Err(Error::invalid_user_data(format!(
                "No candidate versions for {module}"
            ))),
            (_, [single]) => Ok((*single).clone()),
            (Self::Latest, many) => Ok(many
                .iter()
                .max_by(|a, b| Version::parse(a).cmp(&Version::parse(b)))
                .map(|v| (*v).clone())
                .unwrap_or_default()),
            (Self::Strict, many) => Err(Error::VersionConflict {
                module: module.to_string(),
                versions: many.iter().map(|v| (*v).clone()).collect(),
            }),
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> ModuleIdentifier {
        ModuleIdentifier::new("org", "foo")
    }

    fn versions(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn test_latest_picks_newest() {
        let winner = ConflictResolution::Latest
            .select(&module(), &versions(&["1.2", "1.10", "1.9"]))
            .unwrap();
        assert_eq!(winner, "1.10");
    }

    #[test]
    fn test_strict_accepts_agreement() {
        let winner = ConflictResolution::Strict
            .select(&module(), &versions(&["1.0", "1.0"]))
            .unwrap();
        assert_eq!(winner, "1.0");
    }

    #[test]
    fn test_strict_rejects_disagreement() {
        let err = ConflictResolution::Strict
            .select(&module(), &versions(&["1.0", "2.0"]))
            .unwrap_err();
        match err {
            Error::VersionConflict { module, versions } => {
                assert_eq!(module, "org:foo");
                assert_eq!(versions, vec!["1.0", "2.0"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_candidates_is_an_error() {
        assert!(ConflictResolution::Latest.select(&module(), &[]).is_err());
    }

    #[test]
    fn test_serde_names() {
        let parsed: ConflictResolution = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(parsed, ConflictResolution::Strict);
        assert_eq!(ConflictResolution::Latest.to_string(), "latest");
    }
}
