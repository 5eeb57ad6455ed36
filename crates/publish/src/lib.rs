//! Maven repository publishing for depot.
//!
//! [`MavenPublisher`] validates a [`MavenPublication`] without touching the
//! network, then uploads its artifacts, checksums and `maven-metadata.xml`
//! files through a [`Transport`]. Snapshot versions get a timestamp and the
//! next build number of the target repository. Every transfer is retried with
//! exponential backoff, and all publishes in a process are serialized through
//! the [`PublishQueue`].
//!
//! ```rust,ignore
//! use depot_publish::{FileTransport, MavenArtifact, MavenPublication, MavenPublisher};
//! use std::sync::Arc;
//!
//! let publication = MavenPublication::new("maven", "org.example", "lib", "1.0-SNAPSHOT", "build/pom.xml")
//!     .with_main_artifact(MavenArtifact::new("build/lib.jar", "jar"));
//! let outcome = MavenPublisher::new(Arc::new(FileTransport::new("/srv/repo"))).publish(&publication)?;
//! println!("published {}", outcome.file_version);
//! ```

pub mod checksum;
pub mod error;
pub mod metadata;
pub mod publication;
pub mod publisher;
pub mod queue;
pub mod retry;
pub mod snapshot;
pub mod transport;

pub use checksum::ChecksumAlgorithm;
pub use error::{Error, Result, TransportError};
pub use metadata::MavenMetadata;
pub use publication::{MavenArtifact, MavenPublication};
pub use publisher::{MavenPublisher, PublishOutcome, RepositoryMode};
pub use queue::PublishQueue;
pub use snapshot::{SnapshotVersion, is_snapshot};
pub use transport::{FileTransport, Transport};
#[cfg(feature = "http")]
pub use transport::{Credentials, HttpTransport};
