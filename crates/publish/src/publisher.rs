//! Publishing a Maven publication to a repository.

use crate::checksum::ChecksumAlgorithm;
use crate::error::{Error, Result};
use crate::metadata::{LOCAL_METADATA_FILE, METADATA_FILE, MavenMetadata};
use crate::publication::{MavenArtifact, MavenPublication};
use crate::queue::PublishQueue;
use crate::retry::with_retry;
use crate::snapshot::{self, SnapshotVersion};
use crate::transport::{FileTransport, Transport};
use chrono::{DateTime, Utc};
use depot_core::{OperationId, ProblemArena, RetryConfig, Settings};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Layout rules of the target repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryMode {
    /// A shared repository: timestamped snapshots, checksums,
    /// `maven-metadata.xml`.
    Remote,
    /// A local repository: literal `-SNAPSHOT` files, no checksums,
    /// `maven-metadata-local.xml`.
    Local,
}

/// What a publish wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// Version used in uploaded file names.
    pub file_version: String,
    /// Snapshot allocated for a remote snapshot publish.
    pub snapshot: Option<SnapshotVersion>,
    /// Every resource written, in upload order.
    pub resources: Vec<String>,
}

/// Publishes [`MavenPublication`]s to one repository.
#[derive(Clone)]
pub struct MavenPublisher {
    transport: Arc<dyn Transport>,
    mode: RepositoryMode,
    retry: RetryConfig,
    clock: Clock,
    queue: Arc<PublishQueue>,
}

impl fmt::Debug for MavenPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MavenPublisher")
            .field("repository", &self.transport.display_name(""))
            .field("mode", &self.mode)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl MavenPublisher {
    /// A publisher for the remote repository behind `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            mode: RepositoryMode::Remote,
            retry: RetryConfig::default(),
            clock: Arc::new(Utc::now),
            queue: PublishQueue::global(),
        }
    }

    /// A publisher for the local repository in `root`.
    #[must_use]
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            mode: RepositoryMode::Local,
            ..Self::new(Arc::new(FileTransport::new(root)))
        }
    }

    /// Use the retry policy from `settings`.
    #[must_use]
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_retry(settings.retry.clone())
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the clock used for timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Submit to `queue` instead of the global queue.
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<PublishQueue>) -> Self {
        self.queue = queue;
        self
    }

    /// The repository layout in use.
    #[must_use]
    pub const fn mode(&self) -> RepositoryMode {
        self.mode
    }

    /// Validate and publish `publication`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPublication`] before any transfer when the
    /// publication is invalid, [`Error::Network`] when a transfer fails after
    /// every retry, and [`Error::Io`] when a local file cannot be read.
    pub fn publish(&self, publication: &MavenPublication) -> Result<PublishOutcome> {
        let mut problems = ProblemArena::new();
        let operation = problems.begin_operation();
        self.publish_reporting(publication, &mut problems, operation)
    }

    /// Like [`publish`](Self::publish), recording validation problems in the
    /// caller's arena under `operation`.
    ///
    /// # Errors
    ///
    /// See [`publish`](Self::publish).
    pub fn publish_reporting(
        &self,
        publication: &MavenPublication,
        problems: &mut ProblemArena,
        operation: OperationId,
    ) -> Result<PublishOutcome> {
        publication.validate(problems, operation)?;
        let publisher = self.clone();
        let publication = publication.clone();
        self.queue.submit(move || publisher.publish_now(&publication))?
    }

    fn publish_now(&self, publication: &MavenPublication) -> Result<PublishOutcome> {
        let repository = self.transport.display_name("");
        depot_events::emit_publish_started!(publication.coordinates(), repository);
        let now = (self.clock)();
        let mut upload = Upload {
            publisher: self,
            resources: Vec::new(),
        };

        let layout = Layout::of(publication);
        let version = publication.version.as_str();
        let (file_version, snapshot) = self.snapshot_for(&layout, version, now);
        debug!(coordinates = %publication.coordinates(), %file_version, "Publishing");

        let mut files = Vec::new();
        if let Some(main) = &publication.main_artifact {
            files.push((main.clone(), main.file.clone()));
        }
        files.push((MavenArtifact::new(&publication.pom, "pom"), publication.pom.clone()));
        files.extend(publication.artifacts.iter().map(|a| (a.clone(), a.file.clone())));

        for (artifact, path) in &files {
            let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
            let resource = format!(
                "{}/{}",
                layout.version_dir,
                artifact.file_name(&publication.artifact_id, &file_version)
            );
            upload.put_with_checksums(&resource, &bytes)?;
        }

        if snapshot::is_snapshot(version) {
            let resource = format!("{}/{}", layout.version_dir, self.metadata_file());
            let mut metadata = self.read_metadata(&resource);
            metadata.group_id = Some(publication.group_id.clone());
            metadata.artifact_id = Some(publication.artifact_id.clone());
            metadata.version = Some(layout.dir_version.clone());
            match (&snapshot, self.mode) {
                (Some(snapshot), RepositoryMode::Remote) => metadata.set_snapshot(snapshot, now),
                _ => metadata.set_local_copy(now),
            }
            for (artifact, _) in &files {
                metadata.add_snapshot_file(&artifact.extension, artifact.classifier.as_deref(), &file_version, now);
            }
            upload.put_with_checksums(&resource, metadata.to_xml(&resource)?.as_bytes())?;
        }

        let resource = format!("{}/{}", layout.module_dir, self.metadata_file());
        let mut metadata = self.read_metadata(&resource);
        metadata.add_version(
            &publication.group_id,
            &publication.artifact_id,
            &layout.dir_version,
            snapshot::is_snapshot(version),
            now,
        );
        upload.put_with_checksums(&resource, metadata.to_xml(&resource)?.as_bytes())?;

        depot_events::emit_publish_completed!(publication.coordinates(), repository);
        Ok(PublishOutcome {
            file_version,
            snapshot,
            resources: upload.resources,
        })
    }

    /// File version and allocated snapshot for `version`.
    fn snapshot_for(
        &self,
        layout: &Layout,
        version: &str,
        now: DateTime<Utc>,
    ) -> (String, Option<SnapshotVersion>) {
        if let Some((_, existing)) = snapshot::parse_timestamped(version) {
            return (version.to_string(), Some(existing));
        }
        if self.mode == RepositoryMode::Local || !snapshot::is_snapshot(version) {
            return (version.to_string(), None);
        }
        let resource = format!("{}/{}", layout.version_dir, METADATA_FILE);
        let build_number = self.next_build_number(&resource);
        let allocated = SnapshotVersion::at(now, build_number);
        (allocated.version_of(version), Some(allocated))
    }

    /// One more than the build number in the metadata at `resource`, or 1
    /// when the metadata is missing or unreadable.
    fn next_build_number(&self, resource: &str) -> u32 {
        self.read_metadata(resource)
            .snapshot_build_number()
            .map_or(1, |n| n.saturating_add(1))
    }

    /// Existing metadata at `resource`, empty when missing or unreadable.
    fn read_metadata(&self, resource: &str) -> MavenMetadata {
        let operation = format!("GET {}", self.transport.display_name(resource));
        let bytes = match with_retry(&self.retry, &operation, || self.transport.get(resource)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return MavenMetadata::default(),
            Err(e) => {
                warn!(resource, error = %e, "Ignoring unreadable repository metadata");
                return MavenMetadata::default();
            }
        };
        MavenMetadata::parse(resource, &bytes).unwrap_or_else(|e| {
            warn!(resource, error = %e, "Ignoring unreadable repository metadata");
            MavenMetadata::default()
        })
    }

    const fn metadata_file(&self) -> &'static str {
        match self.mode {
            RepositoryMode::Remote => METADATA_FILE,
            RepositoryMode::Local => LOCAL_METADATA_FILE,
        }
    }
}

/// Repository directories of one publication.
struct Layout {
    module_dir: String,
    version_dir: String,
    dir_version: String,
}

impl Layout {
    fn of(publication: &MavenPublication) -> Self {
        let module_dir = format!(
            "{}/{}",
            publication.group_id.replace('.', "/"),
            publication.artifact_id
        );
        let dir_version = match snapshot::parse_timestamped(&publication.version) {
            Some((base, _)) => format!("{base}-SNAPSHOT"),
            None => publication.version.clone(),
        };
        Self {
            version_dir: format!("{module_dir}/{dir_version}"),
            module_dir,
            dir_version,
        }
    }
}

struct Upload<'a> {
    publisher: &'a MavenPublisher,
    resources: Vec<String>,
}

impl Upload<'_> {
    fn put(&mut self, resource: &str, bytes: &[u8]) -> Result<()> {
        let transport = &self.publisher.transport;
        let operation = format!("PUT {}", transport.display_name(resource));
        with_retry(&self.publisher.retry, &operation, || transport.put(resource, bytes))?;
        depot_events::emit_publish_uploaded!(resource);
        self.resources.push(resource.to_string());
        Ok(())
    }

    fn put_with_checksums(&mut self, resource: &str, bytes: &[u8]) -> Result<()> {
        self.put(resource, bytes)?;
        if self.publisher.mode == RepositoryMode::Local {
            return Ok(());
        }
        for algorithm in ChecksumAlgorithm::REQUIRED {
            self.put(&algorithm.resource_for(resource), algorithm.digest(bytes).as_bytes())?;
        }
        for algorithm in ChecksumAlgorithm::OPTIONAL {
            let checksum = algorithm.resource_for(resource);
            if let Err(e) = self.put(&checksum, algorithm.digest(bytes).as_bytes()) {
                warn!(resource = %checksum, error = %e, "Cannot upload checksum, continuing");
            }
        }
        Ok(())
    }
}
