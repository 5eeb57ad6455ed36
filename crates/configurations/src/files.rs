//! File collection view over the artifacts of a configuration hierarchy.

use crate::configuration::Configuration;
use depot_core::tree::{self, FileTreeEvent, Pipeline};
use indexmap::IndexSet;
use std::path::PathBuf;

/// The files of every artifact of a configuration and its ancestors.
#[derive(Debug, Clone)]
pub struct ArtifactFileCollection {
    configuration: Configuration,
}

impl ArtifactFileCollection {
    pub(crate) const fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }

    /// Artifact files, own artifacts first.
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        self.configuration
            .all_artifacts()
            .into_iter()
            .map(|a| a.file)
            .collect()
    }

    /// Tasks that must run before the files exist: the union of the build
    /// dependencies of every artifact across the extends-from graph.
    #[must_use]
    pub fn build_dependencies(&self) -> IndexSet<String> {
        self.configuration
            .hierarchy()
            .iter()
            .flat_map(Configuration::artifacts)
            .flat_map(|artifact| artifact.build_dependencies)
            .collect()
    }

    /// Run the files through `pipeline`, returning the events it keeps.
    #[must_use]
    pub fn visit(&self, pipeline: &Pipeline) -> Vec<FileTreeEvent> {
        pipeline.run(tree::file_events(&self.files()))
    }
}
