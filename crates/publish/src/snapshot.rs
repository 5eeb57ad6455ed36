//! Snapshot version detection and timestamped snapshot versions.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

const SNAPSHOT: &str = "SNAPSHOT";

static TIMESTAMPED: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*)-(\d{8}\.\d{6})-(\d+)$").ok());

/// Whether `version` denotes a snapshot: a case-insensitive `SNAPSHOT`
/// suffix, or an already timestamped `base-yyyyMMdd.HHmmss-N` version.
#[must_use]
pub fn is_snapshot(version: &str) -> bool {
    has_snapshot_suffix(version) || parse_timestamped(version).is_some()
}

fn has_snapshot_suffix(version: &str) -> bool {
    version.len() >= SNAPSHOT.len()
        && version
            .get(version.len() - SNAPSHOT.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(SNAPSHOT))
}

/// Split a timestamped snapshot version into base version and snapshot.
#[must_use]
pub fn parse_timestamped(version: &str) -> Option<(String, SnapshotVersion)> {
    let captures = TIMESTAMPED.as_ref()?.captures(version)?;
    let build_number = captures.get(3)?.as_str().parse().ok()?;
    Some((
        captures.get(1)?.as_str().to_string(),
        SnapshotVersion {
            timestamp: captures.get(2)?.as_str().to_string(),
            build_number,
        },
    ))
}

/// The version without its `-SNAPSHOT` suffix.
#[must_use]
pub fn base_version(version: &str) -> &str {
    if has_snapshot_suffix(version) {
        let cut = version.len() - SNAPSHOT.len();
        let base = version.get(..cut).unwrap_or(version);
        base.strip_suffix('-').unwrap_or(base)
    } else {
        version
    }
}

/// Timestamp and build number of one snapshot upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotVersion {
    /// `yyyyMMdd.HHmmss` in UTC.
    pub timestamp: String,
    /// Build number, starting at 1.
    pub build_number: u32,
}

impl SnapshotVersion {
    /// A snapshot taken at `now` with `build_number`.
    #[must_use]
    pub fn at(now: DateTime<Utc>, build_number: u32) -> Self {
        Self {
            timestamp: now.format("%Y%m%d.%H%M%S").to_string(),
            build_number,
        }
    }

    /// The timestamped version of `version`, e.g. `1.0-20240101.120000-3` for
    /// `1.0-SNAPSHOT`.
    #[must_use]
    pub fn version_of(&self, version: &str) -> String {
        format!("{}-{}", base_version(version), self)
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.build_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_detection() {
        assert!(is_snapshot("1.0-SNAPSHOT"));
        assert!(is_snapshot("1.0-snapshot"));
        assert!(is_snapshot("SNAPSHOT"));
        assert!(is_snapshot("1.0-20240101.120000-3"));
        assert!(!is_snapshot("1.0"));
        assert!(!is_snapshot("1.0-final"));
        assert!(!is_snapshot("1.0-20240101-3"));
    }

    #[test]
    fn test_parse_timestamped() {
        let (base, snapshot) = parse_timestamped("2.1-20240101.120000-3").unwrap();
        assert_eq!(base, "2.1");
        assert_eq!(snapshot.timestamp, "20240101.120000");
        assert_eq!(snapshot.build_number, 3);
    }

    #[test]
    fn test_timestamped_version() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let snapshot = SnapshotVersion::at(now, 12);
        assert_eq!(snapshot.version_of("1.0-SNAPSHOT"), "1.0-20240309.070501-12");
        assert_eq!(base_version("1.0-SNAPSHOT"), "1.0");
        assert_eq!(base_version("1.0"), "1.0");
    }
}
