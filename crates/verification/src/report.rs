//! Aggregating and rendering verification failures.

use crate::error::Error;
use crate::failure::{RepositoryAwareVerificationFailure, SignatureErrorKind, VerificationFailure};
use depot_core::{ComponentArtifactIdentifier, ConsoleMode, Settings};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Flags accumulated over every failure of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationHighLevelErrors {
    maybe_compromised: bool,
    has_missing_checksums: bool,
    has_missing_signatures: bool,
    has_missing_keys: bool,
    has_failed_signatures: bool,
    has_untrusted_keys: bool,
    has_only_missing: bool,
    has_other_problems: bool,
}

impl VerificationHighLevelErrors {
    /// Fold one failure into the flags.
    pub fn record(&mut self, failure: &VerificationFailure) {
        self.maybe_compromised |= failure.is_maybe_compromised();
        if failure.is_missing() {
            self.has_only_missing = true;
        } else {
            self.has_other_problems = true;
        }
        match failure {
            VerificationFailure::MissingChecksums { .. } | VerificationFailure::OnlyIgnoredKeys { .. } => {
                self.has_missing_checksums = true;
            }
            VerificationFailure::MissingSignature { .. } => self.has_missing_signatures = true,
            VerificationFailure::SignatureVerificationFailure { errors, .. } => {
                for error in errors.values() {
                    match error.kind {
                        SignatureErrorKind::Failed => self.has_failed_signatures = true,
                        SignatureErrorKind::PassedNotTrusted => self.has_untrusted_keys = true,
                        SignatureErrorKind::MissingKey => self.has_missing_keys = true,
                        SignatureErrorKind::IgnoredKey => {}
                    }
                }
            }
            VerificationFailure::ChecksumVerificationFailure { .. }
            | VerificationFailure::DeletedArtifact { .. } => {}
        }
    }

    /// A checksum or signature mismatch was seen.
    #[must_use]
    pub const fn is_maybe_compromised(&self) -> bool {
        self.maybe_compromised
    }

    /// Some artifact had no checksum.
    #[must_use]
    pub const fn has_missing_checksums(&self) -> bool {
        self.has_missing_checksums
    }

    /// Some artifact had no signature file.
    #[must_use]
    pub const fn has_missing_signatures(&self) -> bool {
        self.has_missing_signatures
    }

    /// Some signing key could not be downloaded.
    #[must_use]
    pub const fn has_missing_keys(&self) -> bool {
        self.has_missing_keys
    }

    /// Some signature did not match.
    #[must_use]
    pub const fn has_failed_signatures(&self) -> bool {
        self.has_failed_signatures
    }

    /// Some signature matched a key that is not trusted.
    #[must_use]
    pub const fn has_untrusted_keys(&self) -> bool {
        self.has_untrusted_keys
    }

    /// Whether regenerating the verification metadata would fix every problem.
    /// Never true when anything hints at tampering.
    #[must_use]
    pub const fn can_suggest_write_metadata(&self) -> bool {
        self.has_only_missing && !self.has_other_problems && !self.maybe_compromised
    }

    fn write_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.has_missing_checksums {
            flags.push("sha256");
        }
        if self.has_missing_signatures || self.has_missing_keys {
            flags.push("pgp");
        }
        flags
    }
}

/// Receives a report piece by piece.
pub trait ReportRenderer {
    /// Start the report for `subject`.
    fn start(&mut self, subject: &str, artifacts: usize);

    /// Start the failures of one artifact.
    fn start_artifact(&mut self, artifact: &ComponentArtifactIdentifier, repository: &str);

    /// Report the only failure of the current artifact.
    fn report_failure(&mut self, failure: &RepositoryAwareVerificationFailure);

    /// Report several failures of the current artifact as one composite.
    fn report_multiple(&mut self, failures: &[RepositoryAwareVerificationFailure]);

    /// End the report.
    fn finish(&mut self, errors: &VerificationHighLevelErrors);
}

/// Plain text console renderer.
#[derive(Debug)]
pub struct TextReportRenderer {
    mode: ConsoleMode,
    verification_file: PathBuf,
    out: String,
    artifacts: usize,
}

impl TextReportRenderer {
    /// A renderer in `mode` pointing users at `verification_file`.
    #[must_use]
    pub fn new(mode: ConsoleMode, verification_file: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            verification_file: verification_file.into(),
            out: String::new(),
            artifacts: 0,
        }
    }

    /// The rendered text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.out
    }
}

impl ReportRenderer for TextReportRenderer {
    fn start(&mut self, subject: &str, artifacts: usize) {
        self.artifacts = artifacts;
        self.out
            .push_str(&format!("Dependency verification failed for {subject}"));
        match (self.mode, artifacts) {
            (ConsoleMode::Verbose, _) => self.out.push(':'),
            (ConsoleMode::Terse, 1) => self.out.push_str("\nOne artifact failed verification: "),
            (ConsoleMode::Terse, n) => {
                self.out
                    .push_str(&format!("\n{n} artifacts failed verification:"));
            }
        }
    }

    fn start_artifact(&mut self, artifact: &ComponentArtifactIdentifier, repository: &str) {
        match (self.mode, self.artifacts) {
            (ConsoleMode::Terse, 1) => self
                .out
                .push_str(&format!("{artifact} from repository {repository}")),
            (ConsoleMode::Terse, _) => self
                .out
                .push_str(&format!("\n  - {artifact} from repository {repository}")),
            (ConsoleMode::Verbose, _) => self.out.push_str(&format!(
                "\n  - On artifact {artifact} in repository '{repository}': "
            )),
        }
    }

    fn report_failure(&mut self, failure: &RepositoryAwareVerificationFailure) {
        if self.mode == ConsoleMode::Verbose {
            failure.failure().explain(&mut self.out);
        }
    }

    fn report_multiple(&mut self, failures: &[RepositoryAwareVerificationFailure]) {
        if self.mode == ConsoleMode::Terse {
            return;
        }
        self.out.push_str("multiple problems reported:");
        for failure in failures {
            self.out.push_str("\n      - ");
            failure.failure().explain(&mut self.out);
        }
    }

    fn finish(&mut self, errors: &VerificationHighLevelErrors) {
        if errors.is_maybe_compromised() {
            self.out.push_str(
                "\n\nThis can indicate that a dependency has been compromised. Please carefully verify the signatures and checksums.",
            );
        }
        if errors.has_untrusted_keys() {
            self.out.push_str(
                "\n\nSome signature verification failed. Checksums were verified, but the signing keys are not trusted. Add the keys to the trusted keys of the verification metadata if you trust them.",
            );
        }
        if errors.can_suggest_write_metadata() {
            self.out.push_str(&format!(
                "\n\nIf the artifacts are trustworthy, you will need to update the verification metadata file at {}. The missing entries can be generated with --write-verification-metadata {}, but you must review the result.",
                self.verification_file.display(),
                errors.write_flags().join(","),
            ));
        }
        if self.mode == ConsoleMode::Terse {
            self.out.push_str(
                "\n\nFor more details, set the property org.gradle.dependency.verification.console=verbose.",
            );
        }
    }
}

/// The outcome of reporting a set of failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    subject: String,
    artifacts: usize,
    text: String,
    errors: VerificationHighLevelErrors,
}

impl VerificationReport {
    /// Rendered console text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Aggregated flags.
    #[must_use]
    pub const fn errors(&self) -> &VerificationHighLevelErrors {
        &self.errors
    }

    /// Number of artifacts that failed.
    #[must_use]
    pub const fn artifacts(&self) -> usize {
        self.artifacts
    }

    /// Turn the report into an error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::Failed {
            subject: self.subject,
            artifacts: self.artifacts,
            report: self.text,
        }
    }
}

/// Builds console reports from verification failures.
#[derive(Debug, Clone)]
pub struct DependencyVerificationReporter {
    mode: ConsoleMode,
    verification_file: PathBuf,
}

impl DependencyVerificationReporter {
    /// A reporter rendering in `mode`.
    #[must_use]
    pub fn new(mode: ConsoleMode, verification_file: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            verification_file: verification_file.into(),
        }
    }

    /// A reporter configured from settings, honoring the console property.
    #[must_use]
    pub fn from_settings(settings: &Settings, verification_file: impl Into<PathBuf>) -> Self {
        Self::new(settings.console_mode(), verification_file)
    }

    /// The verification metadata file named in hints.
    #[must_use]
    pub fn verification_file(&self) -> &Path {
        &self.verification_file
    }

    /// Render a report with the console renderer.
    #[must_use]
    pub fn generate_report(
        &self,
        subject: &str,
        failures: &HashMap<ComponentArtifactIdentifier, Vec<RepositoryAwareVerificationFailure>>,
    ) -> VerificationReport {
        tracing::debug!(subject, artifacts = failures.len(), mode = ?self.mode, "Rendering verification report");
        let mut renderer = TextReportRenderer::new(self.mode, &self.verification_file);
        let errors = render(subject, failures, &mut renderer);
        depot_events::emit_verification_failed!(subject, failures.len());
        VerificationReport {
            subject: subject.to_string(),
            artifacts: failures.len(),
            text: renderer.into_text(),
            errors,
        }
    }
}

/// Drive `renderer` over `failures` in a stable order and return the
/// aggregated flags.
///
/// Artifacts with a deleted-artifact failure come last, artifacts with
/// missing checksums just before them, everything else first; ties are
/// ordered by artifact display name.
pub fn render(
    subject: &str,
    failures: &HashMap<ComponentArtifactIdentifier, Vec<RepositoryAwareVerificationFailure>>,
    renderer: &mut dyn ReportRenderer,
) -> VerificationHighLevelErrors {
    let ordered = ordered(failures);
    let mut errors = VerificationHighLevelErrors::default();
    renderer.start(subject, ordered.len());
    for (artifact, artifact_failures) in ordered {
        let Some(first) = artifact_failures.first() else {
            continue;
        };
        renderer.start_artifact(artifact, first.repository_name());
        if let [single] = artifact_failures {
            renderer.report_failure(single);
        } else {
            renderer.report_multiple(artifact_failures);
        }
        for failure in artifact_failures {
            errors.record(failure.failure());
        }
    }
    renderer.finish(&errors);
    errors
}

fn rank(failures: &[RepositoryAwareVerificationFailure]) -> u8 {
    failures
        .iter()
        .map(|f| match f.failure() {
            VerificationFailure::DeletedArtifact { .. } => 2,
            VerificationFailure::MissingChecksums { .. } => 1,
            _ => 0,
        })
        .max()
        .unwrap_or(0)
}

fn ordered(
    failures: &HashMap<ComponentArtifactIdentifier, Vec<RepositoryAwareVerificationFailure>>,
) -> Vec<(&ComponentArtifactIdentifier, &[RepositoryAwareVerificationFailure])> {
    let mut entries: Vec<_> = failures
        .iter()
        .map(|(artifact, list)| (rank(list), artifact.display_name(), artifact, list.as_slice()))
        .collect();
    entries.sort_by(|a, b| (a.0, &a.1, a.2).cmp(&(b.0, &b.1, b.2)));
    entries
        .into_iter()
        .map(|(_, _, artifact, list)| (artifact, list))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{ChecksumKind, SignatureError};
    use depot_core::{ArtifactName, ModuleVersionIdentifier};
    use std::collections::BTreeMap;

    fn artifact(name: &str) -> ComponentArtifactIdentifier {
        ComponentArtifactIdentifier::new(
            ModuleVersionIdentifier::new("org", name, "1.0"),
            ArtifactName::new(name, "jar", None),
        )
    }

    fn failure(failure: VerificationFailure) -> RepositoryAwareVerificationFailure {
        RepositoryAwareVerificationFailure::new(failure, "central")
    }

    fn missing(name: &str) -> VerificationFailure {
        VerificationFailure::MissingChecksums {
            file: PathBuf::from(format!("{name}-1.0.jar")),
        }
    }

    fn mismatch(name: &str) -> VerificationFailure {
        VerificationFailure::ChecksumVerificationFailure {
            file: PathBuf::from(format!("{name}-1.0.jar")),
            kind: ChecksumKind::Sha256,
            expected: "abc".into(),
            actual: "def".into(),
        }
    }

    fn reporter(mode: ConsoleMode) -> DependencyVerificationReporter {
        DependencyVerificationReporter::new(mode, "gradle/verification-metadata.xml")
    }

    #[test]
    fn test_missing_checksums_only_suggests_writing_metadata() {
        let failures = HashMap::from([(artifact("a"), vec![failure(missing("a"))])]);
        let report = reporter(ConsoleMode::Terse).generate_report("configuration ':compile'", &failures);
        assert!(report.errors().can_suggest_write_metadata());
        assert!(!report.errors().is_maybe_compromised());
        assert!(report.text().contains("--write-verification-metadata sha256"));
    }

    #[test]
    fn test_mismatch_blocks_suggestion() {
        let failures = HashMap::from([
            (artifact("a"), vec![failure(missing("a"))]),
            (artifact("b"), vec![failure(mismatch("b"))]),
        ]);
        let report = reporter(ConsoleMode::Terse).generate_report("configuration ':compile'", &failures);
        assert!(report.errors().is_maybe_compromised());
        assert!(!report.errors().can_suggest_write_metadata());
        assert!(report.text().contains("compromised"));
        assert!(!report.text().contains("--write-verification-metadata"));
    }

    #[test]
    fn test_terse_single_artifact() {
        let failures = HashMap::from([(artifact("a"), vec![failure(missing("a"))])]);
        let report = reporter(ConsoleMode::Terse).generate_report("configuration ':compile'", &failures);
        assert!(report.text().starts_with(
            "Dependency verification failed for configuration ':compile'\nOne artifact failed verification: a-1.0.jar (org:a:1.0) from repository central"
        ));
    }

    #[test]
    fn test_verbose_lists_every_problem() {
        let failures = HashMap::from([(
            artifact("a"),
            vec![
                failure(mismatch("a")),
                failure(VerificationFailure::SignatureVerificationFailure {
                    file: PathBuf::from("a-1.0.jar"),
                    signature_file: None,
                    errors: BTreeMap::from([(
                        "ABCD".to_string(),
                        SignatureError::new(SignatureErrorKind::PassedNotTrusted),
                    )]),
                }),
            ],
        )]);
        let report = reporter(ConsoleMode::Verbose).generate_report("configuration ':compile'", &failures);
        let text = report.text();
        assert!(text.contains("On artifact a-1.0.jar (org:a:1.0) in repository 'central': multiple problems reported:"));
        assert!(text.contains("\n      - expected a 'sha256' checksum of 'abc' but was 'def'"));
        assert!(text.contains("\n      - artifact was signed with key 'ABCD'"));
        assert!(report.errors().has_untrusted_keys());
        assert!(!text.contains("console=verbose"));
    }

    #[test]
    fn test_order_is_deleted_last_then_missing() {
        let failures = HashMap::from([
            (
                artifact("a"),
                vec![failure(VerificationFailure::DeletedArtifact {
                    file: PathBuf::from("a-1.0.jar"),
                })],
            ),
            (artifact("b"), vec![failure(missing("b"))]),
            (artifact("c"), vec![failure(mismatch("c"))]),
            (artifact("d"), vec![failure(mismatch("d"))]),
        ]);
        let names: Vec<String> = ordered(&failures)
            .into_iter()
            .map(|(a, _)| a.component.name.clone())
            .collect();
        assert_eq!(names, vec!["c", "d", "b", "a"]);
    }

    #[test]
    fn test_into_error_carries_report() {
        let failures = HashMap::from([(artifact("a"), vec![failure(missing("a"))])]);
        let report = reporter(ConsoleMode::Terse).generate_report("configuration ':compile'", &failures);
        let text = report.text().to_string();
        let err = report.into_error();
        assert_eq!(err.to_string(), text);
    }

    #[test]
    fn test_settings_property_selects_verbose() {
        let settings = Settings::from_toml_str(
            "[properties]\n\"org.gradle.dependency.verification.console\" = \"verbose\"\n",
        )
        .unwrap();
        let failures = HashMap::from([(artifact("a"), vec![failure(missing("a"))])]);
        let report = DependencyVerificationReporter::from_settings(&settings, "verification-metadata.xml")
            .generate_report("configuration ':compile'", &failures);
        assert!(report.text().contains("checksum is missing from verification metadata."));
    }
}
