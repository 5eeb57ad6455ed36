//! The closed set of verification failures.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Checksum algorithms understood by verification metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChecksumKind {
    /// MD5.
    Md5,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        })
    }
}

/// Outcome of checking a signature against one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureErrorKind {
    /// The signature matched but the key is not trusted.
    PassedNotTrusted,
    /// The signature did not match.
    Failed,
    /// The key is on the ignore list.
    IgnoredKey,
    /// The key could not be downloaded.
    MissingKey,
}

/// A per-key signature problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureError {
    /// What went wrong.
    pub kind: SignatureErrorKind,
    /// User ids and fingerprint of the key, when the key is known.
    pub key_details: Option<String>,
}

impl SignatureError {
    /// A signature error without key details.
    #[must_use]
    pub const fn new(kind: SignatureErrorKind) -> Self {
        Self {
            kind,
            key_details: None,
        }
    }

    /// Attach key details.
    #[must_use]
    pub fn with_key_details(mut self, details: impl Into<String>) -> Self {
        self.key_details = Some(details.into());
        self
    }
}

/// Why an artifact failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The metadata declares no checksum for the artifact.
    MissingChecksums {
        /// The artifact file.
        file: PathBuf,
    },
    /// A declared checksum did not match.
    ChecksumVerificationFailure {
        /// The artifact file.
        file: PathBuf,
        /// Algorithm that failed.
        kind: ChecksumKind,
        /// Checksum declared in the metadata.
        expected: String,
        /// Checksum of the downloaded file.
        actual: String,
    },
    /// Signature verification failed for at least one key.
    SignatureVerificationFailure {
        /// The artifact file.
        file: PathBuf,
        /// The signature file, if it was downloaded.
        signature_file: Option<PathBuf>,
        /// Problems keyed by key id.
        errors: BTreeMap<String, SignatureError>,
    },
    /// No signature file exists for the artifact.
    MissingSignature {
        /// The artifact file.
        file: PathBuf,
    },
    /// The artifact was signed only with ignored keys and has no checksum.
    OnlyIgnoredKeys {
        /// The artifact file.
        file: PathBuf,
    },
    /// The artifact disappeared from the local cache.
    DeletedArtifact {
        /// The artifact file.
        file: PathBuf,
    },
}

impl VerificationFailure {
    /// The artifact file the failure is about.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        match self {
            Self::MissingChecksums { file }
            | Self::ChecksumVerificationFailure { file, .. }
            | Self::SignatureVerificationFailure { file, .. }
            | Self::MissingSignature { file }
            | Self::OnlyIgnoredKeys { file }
            | Self::DeletedArtifact { file } => file,
        }
    }

    /// Whether the failure suggests the artifact was tampered with.
    #[must_use]
    pub fn is_maybe_compromised(&self) -> bool {
        match self {
            Self::ChecksumVerificationFailure { .. } => true,
            Self::SignatureVerificationFailure { errors, .. } => errors
                .values()
                .any(|e| e.kind == SignatureErrorKind::Failed),
            _ => false,
        }
    }

    /// Whether the failure only reports something absent from the metadata,
    /// which writing the metadata would fix.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::MissingChecksums { .. } | Self::MissingSignature { .. } | Self::OnlyIgnoredKeys { .. } => {
                true
            }
            Self::SignatureVerificationFailure { errors, .. } => errors.values().all(|e| {
                matches!(
                    e.kind,
                    SignatureErrorKind::MissingKey | SignatureErrorKind::IgnoredKey
                )
            }),
            Self::ChecksumVerificationFailure { .. } | Self::DeletedArtifact { .. } => false,
        }
    }

    /// Render the explanation of this failure.
    pub(crate) fn explain(&self, out: &mut String) {
        match self {
            Self::MissingChecksums { .. } => {
                out.push_str("checksum is missing from verification metadata.");
            }
            Self::ChecksumVerificationFailure {
                kind,
                expected,
                actual,
                ..
            } => {
                out.push_str(&format!(
                    "expected a '{kind}' checksum of '{expected}' but was '{actual}'"
                ));
            }
            Self::SignatureVerificationFailure { errors, .. } => {
                let rendered: Vec<String> = errors
                    .iter()
                    .map(|(key, error)| explain_signature(key, error))
                    .collect();
                out.push_str(&rendered.join(", "));
            }
            Self::MissingSignature { .. } => out.push_str("signature file is missing"),
            Self::OnlyIgnoredKeys { .. } => {
                out.push_str("artifact was signed but all keys were ignored");
            }
            Self::DeletedArtifact { .. } => {
                out.push_str("artifact has been deleted from dependency cache");
            }
        }
    }
}

fn explain_signature(key: &str, error: &SignatureError) -> String {
    let key = match &error.key_details {
        Some(details) => format!("'{key}' ({details})"),
        None => format!("'{key}'"),
    };
    match error.kind {
        SignatureErrorKind::PassedNotTrusted => {
            format!("artifact was signed with key {key} but it wasn't found in any trusted source")
        }
        SignatureErrorKind::Failed => {
            format!("artifact was signed with key {key} but signature didn't match")
        }
        SignatureErrorKind::IgnoredKey => format!("artifact was signed with an ignored key: {key}"),
        SignatureErrorKind::MissingKey => format!(
            "key {key} couldn't be found in any key server so verification couldn't be performed"
        ),
    }
}

/// A failure together with the repository the artifact came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryAwareVerificationFailure {
    failure: VerificationFailure,
    repository_name: String,
}

impl RepositoryAwareVerificationFailure {
    /// Attach a repository name to a failure.
    #[must_use]
    pub fn new(failure: VerificationFailure, repository_name: impl Into<String>) -> Self {
        Self {
            failure,
            repository_name: repository_name.into(),
        }
    }

    /// The failure.
    #[must_use]
    pub const fn failure(&self) -> &VerificationFailure {
        &self.failure
    }

    /// Name of the repository the artifact was downloaded from.
    #[must_use]
    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(kinds: &[SignatureErrorKind]) -> VerificationFailure {
        VerificationFailure::SignatureVerificationFailure {
            file: PathBuf::from("lib.jar"),
            signature_file: None,
            errors: kinds
                .iter()
                .enumerate()
                .map(|(i, kind)| (format!("key{i}"), SignatureError::new(*kind)))
                .collect(),
        }
    }

    #[test]
    fn test_classification() {
        let missing = VerificationFailure::MissingChecksums {
            file: PathBuf::from("lib.jar"),
        };
        assert!(missing.is_missing());
        assert!(!missing.is_maybe_compromised());

        let mismatch = VerificationFailure::ChecksumVerificationFailure {
            file: PathBuf::from("lib.jar"),
            kind: ChecksumKind::Sha256,
            expected: "abc".into(),
            actual: "def".into(),
        };
        assert!(!mismatch.is_missing());
        assert!(mismatch.is_maybe_compromised());

        assert!(signature(&[SignatureErrorKind::MissingKey, SignatureErrorKind::IgnoredKey]).is_missing());
        assert!(!signature(&[SignatureErrorKind::PassedNotTrusted]).is_missing());
        assert!(signature(&[SignatureErrorKind::Failed]).is_maybe_compromised());
        assert!(!signature(&[SignatureErrorKind::PassedNotTrusted]).is_maybe_compromised());
    }

    #[test]
    fn test_explanations() {
        let mut out = String::new();
        VerificationFailure::ChecksumVerificationFailure {
            file: PathBuf::from("lib.jar"),
            kind: ChecksumKind::Sha1,
            expected: "abc".into(),
            actual: "def".into(),
        }
        .explain(&mut out);
        assert_eq!(out, "expected a 'sha1' checksum of 'abc' but was 'def'");

        let mut out = String::new();
        VerificationFailure::SignatureVerificationFailure {
            file: PathBuf::from("lib.jar"),
            signature_file: Some(PathBuf::from("lib.jar.asc")),
            errors: BTreeMap::from([(
                "ABCD".to_string(),
                SignatureError::new(SignatureErrorKind::Failed).with_key_details("Jane <jane@example.org>"),
            )]),
        }
        .explain(&mut out);
        assert_eq!(
            out,
            "artifact was signed with key 'ABCD' (Jane <jane@example.org>) but signature didn't match"
        );
    }

    #[test]
    fn test_file_path() {
        let failure = VerificationFailure::DeletedArtifact {
            file: PathBuf::from("/cache/lib.jar"),
        };
        assert_eq!(failure.file_path(), Path::new("/cache/lib.jar"));
    }
}
