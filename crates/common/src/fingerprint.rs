//! Content fingerprints.
//!
//! A fingerprint is the MD5 digest of an entry's path, its UTC modification
//! time and, for regular files, the full file content. It is rendered as a
//! double-quoted lowercase hex string so it can be sent as an `ETag` header
//! without further formatting.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

/// Quoted hex digest identifying one version of a file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn from_digest(digest: md5::Digest) -> Self {
        Self(format!("\"{:x}\"", digest))
    }

    #[cfg(test)]
    pub(crate) fn from_test_str(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an `If-None-Match` header value names this fingerprint.
    ///
    /// This is a substring test, so lists (`"a", "b"`) and weak
    /// validators (`W/"a"`) both match.
    pub fn matches(&self, header: &str) -> bool {
        header.contains(self.0.as_str())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("failed to stat {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

impl FingerprintError {
    /// The underlying filesystem error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Stat { source, .. } | Self::Open { source, .. } | Self::Read { source, .. } => {
                source
            }
        }
    }
}

/// Compute the fingerprint of the entry at `path`.
///
/// Directories hash only their path and modification time. Files also hash
/// their whole content, streamed so memory use does not grow with file size.
pub fn compute(path: &Path, is_dir: bool) -> Result<Fingerprint, FingerprintError> {
    let metadata = fs::metadata(path).map_err(|source| FingerprintError::Stat {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = metadata.modified().map_err(|source| FingerprintError::Stat {
        path: path.to_path_buf(),
        source,
    })?;

    let mut context = md5::Context::new();
    context.consume(path.as_os_str().as_encoded_bytes());
    context.consume(mtime_string(DateTime::<Utc>::from(modified)).as_bytes());

    if !is_dir {
        let mut file = File::open(path).map_err(|source| FingerprintError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        io::copy(&mut file, &mut context).map_err(|source| FingerprintError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    }

    Ok(Fingerprint::from_digest(context.compute()))
}

fn mtime_string(modified: DateTime<Utc>) -> String {
    modified.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
