//! Artifact set sharing across graph edges.
//!
//! These tests verify:
//! - Unfiltered edges into the same configuration share one artifact set
//! - Filtered edges always receive a private artifact set
//! - The result log records the set bound to each edge

#![allow(clippy::unwrap_used, clippy::expect_used)]

use depot_configurations::ConfigurationContainer;
use depot_core::{
    ArtifactFilter, ArtifactName, ArtifactSelector, ComponentArtifactIdentifier, ModuleDependency,
    ModuleVersionIdentifier,
};
use depot_graph::{
    ArtifactResolver, BoxError, DefaultConfigurationResolver, InMemoryModuleSource, ModuleMetadata,
};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

struct RepositoryDir(PathBuf);

impl ArtifactResolver for RepositoryDir {
    fn resolve_artifact(&self, artifact: &ComponentArtifactIdentifier) -> Result<PathBuf, BoxError> {
        let file = self.0.join(artifact.file_name());
        if file.exists() {
            Ok(file)
        } else {
            Err(format!("{} is not in the repository", artifact.file_name()).into())
        }
    }
}

fn shared_module() -> ModuleMetadata {
    ModuleMetadata::new(ModuleVersionIdentifier::new("org", "shared", "1.0")).with_artifact(
        "default",
        ArtifactName::new("shared", "jar", Some("sources".into())),
    )
}

fn requester(index: usize, filtered: bool) -> ModuleMetadata {
    let mut dependency = ModuleDependency::new("org", "shared", "1.0");
    if filtered {
        dependency = dependency.with_selector(ArtifactSelector::Matching(ArtifactFilter {
            extension: None,
            classifier: Some("sources".into()),
        }));
    }
    ModuleMetadata::new(ModuleVersionIdentifier::new("org", format!("requester-{index}"), "1.0"))
        .with_dependency("default", dependency)
}

fn resolver(source: InMemoryModuleSource, repository: PathBuf) -> DefaultConfigurationResolver {
    DefaultConfigurationResolver::new(Arc::new(source), Arc::new(RepositoryDir(repository)))
}

// ============================================================================
// Sharing invariant
// ============================================================================

proptest! {
    #[test]
    fn unfiltered_edges_share_and_filtered_edges_do_not(filters in proptest::collection::vec(any::<bool>(), 1..6)) {
        let mut source = InMemoryModuleSource::new().with_module(shared_module());
        for (index, filtered) in filters.iter().enumerate() {
            source.add(requester(index, *filtered));
        }

        let container = ConfigurationContainer::new(
            ":",
            ModuleVersionIdentifier::new("", "app", "unspecified"),
            Arc::new(resolver(InMemoryModuleSource::new(), PathBuf::new())),
        );
        let compile = container.create("compile").unwrap();
        for index in 0..filters.len() {
            compile
                .add_dependency(ModuleDependency::new("org", format!("requester-{index}"), "1.0"))
                .unwrap();
        }

        let resolved = resolver(source, PathBuf::new()).resolve_configuration(&compile).unwrap();
        let results = resolved.results().unwrap();
        let shared = results
            .nodes()
            .find(|n| n.identifier.module.name == "shared")
            .unwrap()
            .id;

        let mut unfiltered_ids = HashSet::new();
        let mut filtered_ids = Vec::new();
        for edge in results.edges().iter().filter(|e| e.child == shared) {
            let parent = results.node(edge.parent).unwrap();
            let index: usize = parent
                .identifier
                .module
                .name
                .trim_start_matches("requester-")
                .parse()
                .unwrap();
            if filters[index] {
                filtered_ids.push(edge.artifact_set_id);
                prop_assert_eq!(resolved.artifact_set(edge.artifact_set_id).unwrap().len(), 1);
            } else {
                unfiltered_ids.insert(edge.artifact_set_id);
                prop_assert_eq!(resolved.artifact_set(edge.artifact_set_id).unwrap().len(), 2);
            }
        }

        prop_assert!(unfiltered_ids.len() <= 1);
        let unique_filtered: HashSet<u64> = filtered_ids.iter().copied().collect();
        prop_assert_eq!(unique_filtered.len(), filtered_ids.len());
        prop_assert!(unique_filtered.is_disjoint(&unfiltered_ids));
    }
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn files_come_from_the_repository() {
    let repository = tempfile::tempdir().unwrap();
    for name in ["requester-0-1.0.jar", "shared-1.0.jar", "shared-1.0-sources.jar"] {
        std::fs::write(repository.path().join(name), name).unwrap();
    }

    let source = InMemoryModuleSource::new()
        .with_module(shared_module())
        .with_module(requester(0, false));
    let container = ConfigurationContainer::new(
        ":",
        ModuleVersionIdentifier::new("", "app", "unspecified"),
        Arc::new(resolver(source, repository.path().to_path_buf())),
    );
    let compile = container.create("compile").unwrap();
    compile
        .add_dependency(ModuleDependency::new("org", "requester-0", "1.0"))
        .unwrap();

    let names: Vec<String> = compile
        .files()
        .unwrap()
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["requester-0-1.0.jar", "shared-1.0.jar", "shared-1.0-sources.jar"]
    );
}

#[test]
fn missing_artifact_file_fails_files() {
    let repository = tempfile::tempdir().unwrap();
    let source = InMemoryModuleSource::new().with_module(shared_module());
    let container = ConfigurationContainer::new(
        ":",
        ModuleVersionIdentifier::new("", "app", "unspecified"),
        Arc::new(resolver(source, repository.path().to_path_buf())),
    );
    let compile = container.create("compile").unwrap();
    compile
        .add_dependency(ModuleDependency::new("org", "shared", "1.0"))
        .unwrap();

    let err = compile.files().unwrap_err();
    assert!(err.to_string().contains("shared-1.0.jar (org:shared:1.0)"));
}
