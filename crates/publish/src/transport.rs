//! Repository transports.
//!
//! A [`Transport`] reads and writes resources addressed by their path inside a
//! repository, e.g. `org/example/lib/1.0/lib-1.0.jar`. Implementations report
//! a single attempt; retrying is done by the publisher.

use crate::error::TransportError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Access to one repository.
pub trait Transport: Send + Sync {
    /// Read `resource`, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the read fails for any other reason.
    fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError>;

    /// Write `bytes` to `resource`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    fn put(&self, resource: &str, bytes: &[u8]) -> Result<(), TransportError>;

    /// Human readable location of `resource`, used in error messages.
    fn display_name(&self, resource: &str) -> String;
}

/// A repository in a local directory.
#[derive(Debug, Clone)]
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    /// A transport rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The repository directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, resource: &str) -> PathBuf {
        resource
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl Transport for FileTransport {
    fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError> {
        match std::fs::read(self.path(resource)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, resource: &str, bytes: &[u8]) -> Result<(), TransportError> {
        let path = self.path(resource);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn display_name(&self, resource: &str) -> String {
        self.path(resource).display().to_string()
    }
}

#[cfg(feature = "http")]
pub use http::{Credentials, HttpTransport};

#[cfg(feature = "http")]
mod http {
    use super::Transport;
    use crate::error::TransportError;
    use reqwest::StatusCode;
    use reqwest::blocking::{Client, RequestBuilder};

    /// Basic authentication credentials.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Credentials {
        /// User name.
        pub username: String,
        /// Password or token.
        pub password: String,
    }

    /// A remote repository reached over HTTP(S).
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
        base_url: String,
        credentials: Option<Credentials>,
    }

    impl HttpTransport {
        /// A transport for the repository at `base_url`.
        #[must_use]
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                client: Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                credentials: None,
            }
        }

        /// Authenticate with basic credentials.
        #[must_use]
        pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
            self.credentials = Some(Credentials {
                username: username.into(),
                password: password.into(),
            });
            self
        }

        fn url(&self, resource: &str) -> String {
            format!("{}/{}", self.base_url, resource.trim_start_matches('/'))
        }

        fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
            match &self.credentials {
                Some(c) => request.basic_auth(&c.username, Some(&c.password)),
                None => request,
            }
        }
    }

    impl Transport for HttpTransport {
        fn get(&self, resource: &str) -> Result<Option<Vec<u8>>, TransportError> {
            let response = self
                .authenticate(self.client.get(self.url(resource)))
                .send()
                .map_err(|e| TransportError::request(e.to_string()))?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => response
                    .bytes()
                    .map(|b| Some(b.to_vec()))
                    .map_err(|e| TransportError::request(e.to_string())),
                status => Err(TransportError::Status {
                    status: status.as_u16(),
                }),
            }
        }

        fn put(&self, resource: &str, bytes: &[u8]) -> Result<(), TransportError> {
            let response = self
                .authenticate(self.client.put(self.url(resource)))
                .body(bytes.to_vec())
                .send()
                .map_err(|e| TransportError::request(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(TransportError::Status {
                    status: status.as_u16(),
                })
            }
        }

        fn display_name(&self, resource: &str) -> String {
            self.url(resource)
        }
    }

}
