//! Checksum files published next to every uploaded file.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;

/// A checksum algorithm with its repository file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// SHA-1, always published.
    Sha1,
    /// MD5, always published.
    Md5,
    /// SHA-256, best effort.
    Sha256,
    /// SHA-512, best effort.
    Sha512,
}

impl ChecksumAlgorithm {
    /// Algorithms whose upload failure fails the publish.
    pub const REQUIRED: [Self; 2] = [Self::Sha1, Self::Md5];

    /// Algorithms uploaded when possible; failures are logged.
    pub const OPTIONAL: [Self; 2] = [Self::Sha256, Self::Sha512];

    /// File extension: the lowercased algorithm name without hyphens.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Lowercase hex digest of `bytes`.
    #[must_use]
    pub fn digest(self, bytes: &[u8]) -> String {
        match self {
            Self::Sha1 => hex::encode(Sha1::digest(bytes)),
            Self::Md5 => hex::encode(Md5::digest(bytes)),
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
            Self::Sha512 => hex::encode(Sha512::digest(bytes)),
        }
    }

    /// Path of the checksum file for `resource`.
    #[must_use]
    pub fn resource_for(self, resource: &str) -> String {
        format!("{resource}.{}", self.extension())
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
