//! Depot settings loaded from `depot.toml`.
//!
//! ```toml
//! [resolution]
//! conflict = "strict"
//!
//! [retry]
//! max_attempts = 5
//!
//! [verification]
//! console = "verbose"
//!
//! [properties]
//! "org.gradle.dependency.verification.console" = "verbose"
//! ```

use crate::conflict::ConflictResolution;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Property that switches the verification console report to verbose output.
pub const VERIFICATION_CONSOLE_PROPERTY: &str = "org.gradle.dependency.verification.console";

/// Top level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Resolution defaults.
    #[serde(default)]
    pub resolution: ResolutionSettings,

    /// Retry policy for repository access.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Verification report settings.
    #[serde(default)]
    pub verification: VerificationSettings,

    /// Free-form properties.
    #[serde(default)]
    pub properties: IndexMap<String, String>,
}

/// Resolution defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSettings {
    /// Conflict policy for new configurations.
    #[serde(default)]
    pub conflict: ConflictResolution,
}

/// Retry configuration for network operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Initial backoff duration in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// How much detail the console verification report shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleMode {
    /// One summary line.
    #[default]
    Terse,
    /// Every failure explained.
    Verbose,
}

/// Verification report settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSettings {
    /// Console report mode.
    #[serde(default)]
    pub console: ConsoleMode,
}

// Default value functions
const fn default_max_attempts() -> usize {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    100
}

const fn default_max_backoff_ms() -> u64 {
    5000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::io(e, Some(path.to_path_buf()), "read settings")),
        };
        Self::from_toml_str(&text).map_err(|e| match e {
            Error::Settings { message, .. } => Error::settings(path, message),
            other => other,
        })
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`] on malformed TOML or unknown values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::settings("<inline>", e.message().to_string()))
    }

    /// The effective console mode. The verification console property wins over
    /// the `[verification]` table.
    #[must_use]
    pub fn console_mode(&self) -> ConsoleMode {
        match self.properties.get(VERIFICATION_CONSOLE_PROPERTY) {
            Some(value) if value.eq_ignore_ascii_case("verbose") => ConsoleMode::Verbose,
            Some(_) => ConsoleMode::Terse,
            None => self.verification.console,
        }
    }

    /// Look up a free-form property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.resolution.conflict, ConflictResolution::Latest);
        assert_eq!(settings.console_mode(), ConsoleMode::Terse);
    }

    #[test]
    fn test_parse_full() {
        let settings = Settings::from_toml_str(
            r#"
[resolution]
conflict = "strict"

[retry]
max_attempts = 5
initial_backoff_ms = 10

[verification]
console = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(settings.resolution.conflict, ConflictResolution::Strict);
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.initial_backoff_ms, 10);
        assert_eq!(settings.retry.max_backoff_ms, 5000);
        assert_eq!(settings.console_mode(), ConsoleMode::Verbose);
    }

    #[test]
    fn test_property_overrides_console_table() {
        let settings = Settings::from_toml_str(
            r#"
[verification]
console = "terse"

[properties]
"org.gradle.dependency.verification.console" = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(settings.console_mode(), ConsoleMode::Verbose);
        assert_eq!(
            settings.property(VERIFICATION_CONSOLE_PROPERTY),
            Some("verbose")
        );
    }

    #[test]
    fn test_unknown_conflict_policy_rejected() {
        let err = Settings::from_toml_str("[resolution]\nconflict = \"newest\"\n").unwrap_err();
        assert!(matches!(err, Error::Settings { .. }));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::load(&temp.path().join("depot.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("depot.toml");
        std::fs::write(&path, "[retry\n").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("depot.toml"));
    }
}
