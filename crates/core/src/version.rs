//! Version ordering used by the `latest` conflict policy.
//!
//! A version string is split on `.`, `-`, `_` and `+` and at every boundary
//! between digits and letters. Parts are compared left to right:
//! - two numeric parts compare numerically
//! - a numeric part is greater than a non-numeric one
//! - two non-numeric parts compare by qualifier rank, then lexically
//!
//! Qualifier ranks: `dev` < any other word < `rc` < `snapshot` < `final` < `ga`
//! < `release` < `sp`. When one version runs out of parts, an extra numeric
//! part makes the longer version greater and an extra qualifier makes it smaller.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Number(u64, String),
    Word(String),
}

impl Part {
    fn qualifier_rank(word: &str) -> u8 {
        match word.to_ascii_lowercase().as_str() {
            "dev" => 0,
            "rc" => 2,
            "snapshot" => 3,
            "final" => 4,
            "ga" => 5,
            "release" => 6,
            "sp" => 7,
            _ => 1,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a, a_text), Self::Number(b, b_text)) => {
                a.cmp(b).then_with(|| a_text.cmp(b_text))
            }
            (Self::Number(..), Self::Word(_)) => Ordering::Greater,
            (Self::Word(_), Self::Number(..)) => Ordering::Less,
            (Self::Word(a), Self::Word(b)) => Self::qualifier_rank(a)
                .cmp(&Self::qualifier_rank(b))
                .then_with(|| a.cmp(b)),
        }
    }
}

/// A parsed version that can be ordered.
#[derive(Debug, Clone)]
pub struct Version {
    source: String,
    parts: Vec<Part>,
}

impl Version {
    /// Parse a version string. Parsing never fails; any string has an order.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut current_numeric = false;

        let flush = |current: &mut String, numeric: bool, parts: &mut Vec<Part>| {
            if current.is_empty() {
                return;
            }
            let text = std::mem::take(current);
            if numeric {
                // Overlong digit runs saturate and fall back to textual comparison.
                let value = text.parse::<u64>().unwrap_or(u64::MAX);
                parts.push(Part::Number(value, text));
            } else {
                parts.push(Part::Word(text));
            }
        };

        for ch in source.chars() {
            if matches!(ch, '.' | '-' | '_' | '+') {
                flush(&mut current, current_numeric, &mut parts);
                continue;
            }
            let numeric = ch.is_ascii_digit();
            if !current.is_empty() && numeric != current_numeric {
                flush(&mut current, current_numeric, &mut parts);
            }
            current_numeric = numeric;
            current.push(ch);
        }
        flush(&mut current, current_numeric, &mut parts);

        Self {
            source: source.to_string(),
            parts,
        }
    }

    /// The original text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut left = self.parts.iter();
        let mut right = other.parts.iter();
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => match a.compare(b) {
                    Ordering::Equal => {}
                    ordering => return ordering,
                },
                (Some(Part::Number(..)), None) => return Ordering::Greater,
                (Some(Part::Word(_)), None) => return Ordering::Less,
                (None, Some(Part::Number(..))) => return Ordering::Less,
                (None, Some(Part::Word(_))) => return Ordering::Greater,
                // Equal part lists can still differ textually ("1.0" vs "1-0").
                (None, None) => return self.source.cmp(&other.source),
            }
        }
    }
}

/// Compare two version strings.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_less(a: &str, b: &str) {
        assert_eq!(compare_versions(a, b), Ordering::Less, "{a} < {b}");
        assert_eq!(compare_versions(b, a), Ordering::Greater, "{b} > {a}");
    }

    #[test]
    fn test_numeric_parts_compare_numerically() {
        assert_less("1.2", "1.10");
        assert_less("1.9.9", "2.0");
        assert_less("1.0", "1.0.1");
    }

    #[test]
    fn test_qualifiers() {
        assert_less("1.0-dev", "1.0-alpha");
        assert_less("1.0-alpha", "1.0-beta");
        assert_less("1.0-beta", "1.0-rc");
        assert_less("1.0-rc", "1.0-snapshot");
        assert_less("1.0-snapshot", "1.0-final");
        assert_less("1.0-final", "1.0-ga");
        assert_less("1.0-ga", "1.0-release");
        assert_less("1.0-release", "1.0-sp");
    }

    #[test]
    fn test_extra_qualifier_is_lower() {
        assert_less("1.0-rc1", "1.0");
        assert_less("1.1.a", "1.1");
    }

    #[test]
    fn test_digit_letter_boundary_splits() {
        assert_less("1.0rc1", "1.0rc2");
        assert_less("1.0a", "1.0.0");
    }

    #[test]
    fn test_equal_parts_fall_back_to_text() {
        assert_eq!(compare_versions("1.0", "1.0"), Ordering::Equal);
        assert_ne!(compare_versions("1.0", "1-0"), Ordering::Equal);
    }

    #[test]
    fn test_sorting() {
        let mut versions: Vec<Version> = ["2.0", "1.0-SNAPSHOT", "1.10", "1.2", "1.0"]
            .iter()
            .map(|v| Version::parse(v))
            .collect();
        versions.sort();
        let sorted: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(sorted, vec!["1.0-SNAPSHOT", "1.0", "1.2", "1.10", "2.0"]);
    }
}
