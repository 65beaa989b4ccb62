use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::fingerprint::Fingerprint;

/// Cached metadata for one key.
///
/// Entries are never updated in place; a rescan that detects a change
/// builds a new `Entry` and swaps it into the bucket map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Size in bytes. Always 0 for directories.
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub fingerprint: Fingerprint,
    pub is_dir: bool,
}

impl Entry {
    /// The staleness check: an entry whose modification time (and, for
    ///  files, size) still matches the filesystem is reused as-is.
    ///
    /// A content change that preserves both size and modification time
    ///  goes undetected.
    pub fn is_unchanged(&self, size: u64, last_modified: DateTime<Utc>) -> bool {
        self.last_modified == last_modified && (self.is_dir || self.size == size)
    }
}

/// Key-to-entry map for a single bucket.
pub(crate) type BucketMap = HashMap<String, Entry>;

/// An owned, point-in-time copy of one bucket's entries.
///
/// Taken under the bucket's read lock, so every entry in it is whole, but
/// during a scan it may mix entries from before and after the scan.
#[derive(Debug, Clone, Default)]
pub struct BucketSnapshot {
    name: String,
    entries: BucketMap,
}

impl BucketSnapshot {
    pub(crate) fn new(name: String, entries: BucketMap) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries ordered by key.
    pub fn sorted(&self) -> Vec<(&str, &Entry)> {
        let mut items: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
            .collect();
        items.sort_unstable_by(|a, b| a.0.cmp(b.0));
        items
    }

    /// Entries whose key starts with `prefix`, ordered by key.
    pub fn sorted_with_prefix(&self, prefix: &str) -> Vec<(&str, &Entry)> {
        let mut items = self.sorted();
        items.retain(|(key, _)| key.starts_with(prefix));
        items
    }

    pub fn into_entries(self) -> HashMap<String, Entry> {
        self.entries
    }
}
