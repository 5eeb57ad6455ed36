//! File tree traversal as an event stream.
//!
//! A walk produces a flat list of [`FileTreeEvent`]s. A [`Pipeline`] is a chain
//! of pure stages, each `FileTreeEvent -> Option<FileTreeEvent>`, applied to
//! every event in turn. A stage returning `None` drops the event.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// One step of a file tree traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileTreeEvent {
    /// A directory is entered.
    EnterDir {
        /// Absolute path.
        path: PathBuf,
        /// Path relative to the walk root.
        relative: PathBuf,
    },
    /// A regular file.
    File {
        /// Absolute path.
        path: PathBuf,
        /// Path relative to the walk root.
        relative: PathBuf,
    },
    /// A directory is left.
    LeaveDir {
        /// Absolute path.
        path: PathBuf,
        /// Path relative to the walk root.
        relative: PathBuf,
    },
}

impl FileTreeEvent {
    /// Path relative to the walk root.
    #[must_use]
    pub fn relative(&self) -> &Path {
        match self {
            Self::EnterDir { relative, .. }
            | Self::File { relative, .. }
            | Self::LeaveDir { relative, .. } => relative,
        }
    }

    /// Absolute path.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::EnterDir { path, .. } | Self::File { path, .. } | Self::LeaveDir { path, .. } => {
                path
            }
        }
    }

    /// Whether this is a file event.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }
}

/// Walk `root` depth first in file name order.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn walk(root: &Path) -> Result<Vec<FileTreeEvent>> {
    let mut events = Vec::new();
    let mut open_dirs: Vec<(usize, PathBuf, PathBuf)> = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf);
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("file system loop"));
            Error::io(source, path, "walk file tree")
        })?;

        while open_dirs
            .last()
            .is_some_and(|(depth, _, _)| *depth >= entry.depth())
        {
            if let Some((_, path, relative)) = open_dirs.pop() {
                events.push(FileTreeEvent::LeaveDir { path, relative });
            }
        }

        let path = entry.path().to_path_buf();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        if entry.file_type().is_dir() {
            events.push(FileTreeEvent::EnterDir {
                path: path.clone(),
                relative: relative.clone(),
            });
            open_dirs.push((entry.depth(), path, relative));
        } else {
            events.push(FileTreeEvent::File { path, relative });
        }
    }

    while let Some((_, path, relative)) = open_dirs.pop() {
        events.push(FileTreeEvent::LeaveDir { path, relative });
    }
    Ok(events)
}

/// File events for a flat list of files, relative to their own directory.
#[must_use]
pub fn file_events(files: &[PathBuf]) -> Vec<FileTreeEvent> {
    files
        .iter()
        .map(|path| FileTreeEvent::File {
            path: path.clone(),
            relative: path
                .file_name()
                .map_or_else(|| path.clone(), PathBuf::from),
        })
        .collect()
}

/// A single pipeline stage.
pub type Stage = Arc<dyn Fn(FileTreeEvent) -> Option<FileTreeEvent> + Send + Sync>;

/// An ordered composition of stages.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl Pipeline {
    /// A pipeline passing everything through.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    #[must_use]
    pub fn then(
        mut self,
        stage: impl Fn(FileTreeEvent) -> Option<FileTreeEvent> + Send + Sync + 'static,
    ) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Run one event through every stage.
    #[must_use]
    pub fn apply(&self, event: FileTreeEvent) -> Option<FileTreeEvent> {
        self.stages
            .iter()
            .try_fold(event, |event, stage| stage(event))
    }

    /// Run a stream of events through the pipeline.
    pub fn run(&self, events: impl IntoIterator<Item = FileTreeEvent>) -> Vec<FileTreeEvent> {
        events.into_iter().filter_map(|e| self.apply(e)).collect()
    }
}

fn glob_set(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| Error::Pattern {
            pattern: (*pattern).to_string(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| Error::Pattern {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Keep only files whose relative path matches one of `patterns`. Directory
/// events pass through.
///
/// # Errors
///
/// Returns an error if a pattern is malformed.
pub fn include(
    patterns: &[&str],
) -> Result<impl Fn(FileTreeEvent) -> Option<FileTreeEvent> + Send + Sync + 'static> {
    let set = glob_set(patterns)?;
    Ok(move |event: FileTreeEvent| {
        if !event.is_file() || set.is_match(event.relative()) {
            Some(event)
        } else {
            None
        }
    })
}

/// Drop files whose relative path matches one of `patterns`.
///
/// # Errors
///
/// Returns an error if a pattern is malformed.
pub fn exclude(
    patterns: &[&str],
) -> Result<impl Fn(FileTreeEvent) -> Option<FileTreeEvent> + Send + Sync + 'static> {
    let set = glob_set(patterns)?;
    Ok(move |event: FileTreeEvent| {
        if event.is_file() && set.is_match(event.relative()) {
            None
        } else {
            Some(event)
        }
    })
}

/// Keep only files with the given extension.
pub fn extension(
    extension: impl Into<String>,
) -> impl Fn(FileTreeEvent) -> Option<FileTreeEvent> + Send + Sync + 'static {
    let extension = extension.into();
    move |event: FileTreeEvent| {
        let keep = !event.is_file()
            || event
                .relative()
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(extension.as_str()));
        keep.then_some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn relative_names(events: &[FileTreeEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| {
                let kind = match e {
                    FileTreeEvent::EnterDir { .. } => "enter",
                    FileTreeEvent::File { .. } => "file",
                    FileTreeEvent::LeaveDir { .. } => "leave",
                };
                format!("{kind}:{}", e.relative().display())
            })
            .collect()
    }

    #[test]
    fn test_walk_emits_balanced_events() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("lib")).unwrap();
        std::fs::write(temp.path().join("lib/a.jar"), b"a").unwrap();
        std::fs::write(temp.path().join("readme.txt"), b"r").unwrap();

        let events = walk(temp.path()).unwrap();
        assert_eq!(
            relative_names(&events),
            vec![
                "enter:",
                "enter:lib",
                "file:lib/a.jar",
                "leave:lib",
                "file:readme.txt",
                "leave:",
            ]
        );
    }

    #[test]
    fn test_pipeline_composes_stages() {
        let files = vec![
            PathBuf::from("/repo/a.jar"),
            PathBuf::from("/repo/a-sources.jar"),
            PathBuf::from("/repo/a.pom"),
        ];
        let pipeline = Pipeline::new()
            .then(extension("jar"))
            .then(exclude(&["*-sources.jar"]).unwrap());
        let kept = pipeline.run(file_events(&files));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path(), Path::new("/repo/a.jar"));
    }

    #[test]
    fn test_include_passes_directories() {
        let stage = include(&["**/*.jar"]).unwrap();
        let dir = FileTreeEvent::EnterDir {
            path: PathBuf::from("/x/lib"),
            relative: PathBuf::from("lib"),
        };
        assert!(stage(dir).is_some());
        let file = FileTreeEvent::File {
            path: PathBuf::from("/x/lib/a.txt"),
            relative: PathBuf::from("lib/a.txt"),
        };
        assert!(stage(file).is_none());
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        assert!(matches!(include(&["a[b"]), Err(Error::Pattern { .. })));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let events = file_events(&[PathBuf::from("/a/b.jar")]);
        assert_eq!(Pipeline::new().run(events.clone()), events);
    }
}
