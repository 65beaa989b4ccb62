//! In-memory index of buckets and their entries.
//!
//! The index maps bucket name to a per-bucket map of key to [`Entry`]. The
//! bucket-name map and every bucket map sit behind their own reader/writer
//! lock; scans hold a bucket's write lock only for one insert or for the
//! final reconciliation, never across filesystem I/O.

mod entry;
mod scan;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

pub use entry::{BucketSnapshot, Entry};

use entry::BucketMap;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("no such bucket: {0}")]
    NoSuchBucket(String),
    #[error("no such key: {bucket}/{key}")]
    NoSuchKey { bucket: String, key: String },
    #[error("failed to list scan root {root}: {source}")]
    ScanAborted { root: PathBuf, source: io::Error },
}

/// Counters for one bucket scan, or the sum over a whole scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Entries that were new or changed and got a fresh fingerprint.
    pub fingerprinted: usize,
    /// Entries that passed the staleness check and were kept.
    pub unchanged: usize,
    /// Cached keys dropped because they were not seen on disk.
    pub removed: usize,
    /// Entries skipped because of a filesystem error.
    pub errors: usize,
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.fingerprinted += other.fingerprinted;
        self.unchanged += other.unchanged;
        self.removed += other.removed;
        self.errors += other.errors;
    }
}

/// Outcome of a [`MetadataCache::scan_all`] call.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub buckets: usize,
    /// Buckets dropped from the index because their directory is gone.
    pub pruned_buckets: usize,
    pub totals: ScanStats,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct MetadataCache {
    buckets: RwLock<HashMap<String, Arc<RwLock<BucketMap>>>>,
    ready: AtomicBool,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether at least one full scan has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Scan every immediate subdirectory of `root` as a bucket.
    ///
    /// Each bucket is walked on its own scoped thread and the call returns
    /// only after all of them finish. If `root` itself cannot be listed the
    /// cycle is aborted and the index is left exactly as it was.
    pub fn scan_all(&self, root: &Path) -> Result<ScanReport, CacheError> {
        let started = Instant::now();
        let buckets = list_bucket_dirs(root)?;

        let results: Vec<(&str, ScanStats)> = thread::scope(|scope| {
            let handles: Vec<_> = buckets
                .iter()
                .map(|(name, path)| {
                    let handle = scope.spawn(move || self.scan_bucket(name, path));
                    (name.as_str(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| match handle.join() {
                    Ok(stats) => (name, stats),
                    Err(_) => {
                        tracing::error!(bucket = name, "bucket scan panicked");
                        (
                            name,
                            ScanStats {
                                errors: 1,
                                ..Default::default()
                            },
                        )
                    }
                })
                .collect()
        });

        let mut totals = ScanStats::default();
        for (name, stats) in results {
            tracing::debug!(
                bucket = name,
                fingerprinted = stats.fingerprinted,
                unchanged = stats.unchanged,
                removed = stats.removed,
                errors = stats.errors,
                "bucket scanned"
            );
            totals += stats;
        }

        let seen: HashSet<&str> = buckets.iter().map(|(name, _)| name.as_str()).collect();
        let pruned_buckets = {
            let mut index = self.buckets.write();
            let before = index.len();
            index.retain(|name, _| seen.contains(name.as_str()));
            before - index.len()
        };

        self.ready.store(true, Ordering::Release);

        Ok(ScanReport {
            buckets: buckets.len(),
            pruned_buckets,
            totals,
            elapsed: started.elapsed(),
        })
    }

    /// Names of all known buckets, sorted.
    pub fn list_buckets(&self) -> Vec<String> {
        let mut names: Vec<String> = self.buckets.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// A copy of the bucket's current entries.
    pub fn get_bucket(&self, bucket: &str) -> Result<BucketSnapshot, CacheError> {
        let handle = self.existing_bucket(bucket)?;
        let entries = handle.read().clone();
        Ok(BucketSnapshot::new(bucket.to_string(), entries))
    }

    pub fn get_entry(&self, bucket: &str, key: &str) -> Result<Entry, CacheError> {
        let handle = self.existing_bucket(bucket)?;
        let entry = handle.read().get(key).cloned();
        entry.ok_or_else(|| CacheError::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    fn existing_bucket(&self, bucket: &str) -> Result<Arc<RwLock<BucketMap>>, CacheError> {
        self.buckets
            .read()
            .get(bucket)
            .cloned()
            .ok_or_else(|| CacheError::NoSuchBucket(bucket.to_string()))
    }

    fn bucket_or_insert(&self, bucket: &str) -> Arc<RwLock<BucketMap>> {
        if let Some(handle) = self.buckets.read().get(bucket) {
            return handle.clone();
        }
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .clone()
    }
}

/// Immediate subdirectories of `root`, following symlinks.
fn list_bucket_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>, CacheError> {
    let read_dir = fs::read_dir(root).map_err(|source| CacheError::ScanAborted {
        root: root.to_path_buf(),
        source,
    })?;

    let mut buckets = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = match dir_entry {
            Ok(dir_entry) => dir_entry,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "failed to read root entry");
                continue;
            }
        };

        let path = dir_entry.path();
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to stat bucket");
                continue;
            }
        }

        match dir_entry.file_name().into_string() {
            Ok(name) => buckets.push((name, path)),
            Err(raw) => {
                tracing::warn!(name = ?raw, "skipping bucket with non UTF-8 name");
            }
        }
    }

    Ok(buckets)
}
