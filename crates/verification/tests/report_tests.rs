//! Verification report behavior.
//!
//! These tests verify:
//! - Writing metadata is suggested only when every failure is a missing entry
//! - The rendered text does not depend on the order failures were collected in

#![allow(clippy::unwrap_used, clippy::expect_used)]

use depot_core::{ArtifactName, ComponentArtifactIdentifier, ConsoleMode, ModuleVersionIdentifier};
use depot_verification::{
    ChecksumKind, DependencyVerificationReporter, RepositoryAwareVerificationFailure, SignatureError,
    SignatureErrorKind, VerificationFailure,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

fn artifact(index: usize) -> ComponentArtifactIdentifier {
    let name = format!("lib{index}");
    ComponentArtifactIdentifier::new(
        ModuleVersionIdentifier::new("org", &name, "1.0"),
        ArtifactName::new(name.clone(), "jar", None),
    )
}

fn failure_of(kind: u8, index: usize) -> VerificationFailure {
    let file = PathBuf::from(format!("lib{index}-1.0.jar"));
    match kind % 6 {
        0 => VerificationFailure::MissingChecksums { file },
        1 => VerificationFailure::ChecksumVerificationFailure {
            file,
            kind: ChecksumKind::Sha256,
            expected: "aaaa".into(),
            actual: "bbbb".into(),
        },
        2 => VerificationFailure::MissingSignature { file },
        3 => VerificationFailure::SignatureVerificationFailure {
            file,
            signature_file: None,
            errors: BTreeMap::from([("CAFE".to_string(), SignatureError::new(SignatureErrorKind::Failed))]),
        },
        4 => VerificationFailure::SignatureVerificationFailure {
            file,
            signature_file: None,
            errors: BTreeMap::from([("BEEF".to_string(), SignatureError::new(SignatureErrorKind::MissingKey))]),
        },
        _ => VerificationFailure::DeletedArtifact { file },
    }
}

fn is_missing_kind(kind: u8) -> bool {
    matches!(kind % 6, 0 | 2 | 4)
}

fn failures(kinds: &[u8]) -> Vec<(ComponentArtifactIdentifier, Vec<RepositoryAwareVerificationFailure>)> {
    kinds
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            (
                artifact(index),
                vec![RepositoryAwareVerificationFailure::new(failure_of(*kind, index), "central")],
            )
        })
        .collect()
}

// ============================================================================
// Metadata suggestion
// ============================================================================

proptest! {
    #[test]
    fn suggestion_only_for_pure_missing_entries(kinds in proptest::collection::vec(0u8..6, 1..8)) {
        let map: HashMap<_, _> = failures(&kinds).into_iter().collect();
        let report = DependencyVerificationReporter::new(ConsoleMode::Terse, "verification-metadata.xml")
            .generate_report("configuration ':compile'", &map);

        let all_missing = kinds.iter().all(|k| is_missing_kind(*k));
        prop_assert_eq!(report.errors().can_suggest_write_metadata(), all_missing);
        prop_assert_eq!(report.text().contains("--write-verification-metadata"), all_missing);
        if report.errors().is_maybe_compromised() {
            prop_assert!(!report.errors().can_suggest_write_metadata());
        }
    }
}

// ============================================================================
// Deterministic rendering
// ============================================================================

proptest! {
    #[test]
    fn rendering_ignores_collection_order(
        kinds in proptest::collection::vec(0u8..6, 1..8),
        verbose in any::<bool>(),
        rotation in 0usize..8,
    ) {
        let mode = if verbose { ConsoleMode::Verbose } else { ConsoleMode::Terse };
        let reporter = DependencyVerificationReporter::new(mode, "verification-metadata.xml");

        let forward = failures(&kinds);
        let mut rotated = forward.clone();
        rotated.reverse();
        let by = rotation % rotated.len();
        rotated.rotate_left(by);

        let a: HashMap<_, _> = forward.into_iter().collect();
        let b: HashMap<_, _> = rotated.into_iter().collect();
        let first = reporter.generate_report("configuration ':compile'", &a);
        let second = reporter.generate_report("configuration ':compile'", &b);
        prop_assert_eq!(first.text(), second.text());
    }
}

#[test]
fn deleted_artifacts_render_last() {
    let map: HashMap<_, _> = failures(&[5, 1, 0]).into_iter().collect();
    let report = DependencyVerificationReporter::new(ConsoleMode::Terse, "verification-metadata.xml")
        .generate_report("configuration ':compile'", &map);
    let text = report.text();
    let mismatch = text.find("lib1-1.0.jar").unwrap();
    let missing = text.find("lib2-1.0.jar").unwrap();
    let deleted = text.find("lib0-1.0.jar").unwrap();
    assert!(mismatch < missing);
    assert!(missing < deleted);
    assert!(text.starts_with("Dependency verification failed for configuration ':compile'\n3 artifacts failed verification:"));
}
