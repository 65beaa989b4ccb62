use std::collections::HashSet;
use std::io;
use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{Entry, MetadataCache, ScanStats};
use crate::fingerprint;

impl MetadataCache {
    /// Walk one bucket directory and bring its entries up to date.
    ///
    /// Unchanged entries are kept, new or changed ones are fingerprinted and
    /// replaced one at a time, and once the walk is done every cached key
    /// that was not seen is removed. Filesystem errors skip the affected
    /// entry and never abort the walk; the entry keeps whatever is cached
    /// for it unless the error says it no longer exists.
    pub fn scan_bucket(&self, bucket: &str, bucket_path: &Path) -> ScanStats {
        let handle = self.bucket_or_insert(bucket);
        let mut stats = ScanStats::default();
        let mut observed: HashSet<String> = HashSet::new();
        // keys (directory prefixes) whose contents could not be listed
        let mut unreadable: Vec<String> = Vec::new();

        for item in WalkDir::new(bucket_path).min_depth(1).follow_links(true) {
            let dir_entry = match item {
                Ok(dir_entry) => dir_entry,
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(bucket, error = %e, "failed to walk entry");
                    if !is_not_found(e.io_error()) {
                        // the path is still there, whether it was a file or a directory
                        if let Some(path) = e.path() {
                            observed.extend(object_key(bucket_path, path, false));
                            unreadable.extend(object_key(bucket_path, path, true));
                        }
                    }
                    continue;
                }
            };

            let path = dir_entry.path();
            let is_dir = dir_entry.file_type().is_dir();
            let Some(key) = object_key(bucket_path, path, is_dir) else {
                stats.errors += 1;
                tracing::warn!(bucket, path = %path.display(), "skipping entry with non UTF-8 path");
                continue;
            };

            let metadata = match dir_entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(bucket, key = %key, error = %e, "failed to stat entry");
                    if !is_not_found(e.io_error()) {
                        observed.insert(key);
                    }
                    continue;
                }
            };
            let last_modified = match metadata.modified() {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(bucket, key = %key, error = %e, "no modification time for entry");
                    if !is_not_found(Some(&e)) {
                        observed.insert(key);
                    }
                    continue;
                }
            };
            let size = if is_dir { 0 } else { metadata.len() };

            observed.insert(key.clone());

            let unchanged = handle
                .read()
                .get(&key)
                .is_some_and(|cached| cached.is_unchanged(size, last_modified));
            if unchanged {
                tracing::trace!(bucket, key = %key, "entry unchanged");
                stats.unchanged += 1;
                continue;
            }

            match fingerprint::compute(path, is_dir) {
                Ok(fingerprint) => {
                    let entry = Entry {
                        size,
                        last_modified,
                        fingerprint,
                        is_dir,
                    };
                    handle.write().insert(key, entry);
                    stats.fingerprinted += 1;
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::warn!(bucket, key = %key, error = %e, "failed to fingerprint entry");
                    if is_not_found(Some(e.io_error())) {
                        observed.remove(&key);
                    }
                }
            }
        }

        let mut entries = handle.write();
        let before = entries.len();
        entries.retain(|key, _| {
            observed.contains(key) || unreadable.iter().any(|prefix| key.starts_with(prefix))
        });
        stats.removed = before - entries.len();

        stats
    }
}

fn is_not_found(error: Option<&io::Error>) -> bool {
    error.is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// The bucket-relative key for `path`: `/`-separated on every platform,
/// with a trailing `/` for directories. The bucket root maps to `""`.
fn object_key(bucket_path: &Path, path: &Path, is_dir: bool) -> Option<String> {
    let relative = path.strip_prefix(bucket_path).ok()?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            _ => return None,
        }
    }

    let mut key = segments.join("/");
    if is_dir && !key.is_empty() {
        key.push('/');
    }
    Some(key)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_object_key() {
        let root = Path::new("/srv/photos");
        assert_eq!(
            object_key(root, Path::new("/srv/photos/a.jpg"), false).as_deref(),
            Some("a.jpg")
        );
        assert_eq!(
            object_key(root, Path::new("/srv/photos/2024/b.jpg"), false).as_deref(),
            Some("2024/b.jpg")
        );
        assert_eq!(
            object_key(root, Path::new("/srv/photos/2024"), true).as_deref(),
            Some("2024/")
        );
        assert_eq!(object_key(root, root, true).as_deref(), Some(""));
        assert_eq!(object_key(root, Path::new("/srv/other/a"), false), None);
    }

    #[test]
    fn test_scan_bucket_counts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
        fs::write(dir.path().join("sub").join("b.txt"), b"bb").unwrap();

        let cache = MetadataCache::new();
        let first = cache.scan_bucket("docs", dir.path());
        assert_eq!(first.fingerprinted, 3);
        assert_eq!(first.unchanged, 0);
        assert_eq!(first.errors, 0);

        let second = cache.scan_bucket("docs", dir.path());
        assert_eq!(second.fingerprinted, 0);
        assert_eq!(second.unchanged, 3);

        fs::remove_file(dir.path().join("sub").join("b.txt")).unwrap();
        let third = cache.scan_bucket("docs", dir.path());
        assert_eq!(third.removed, 1);

        let snapshot = cache.get_bucket("docs").unwrap();
        assert!(snapshot.contains_key("a.txt"));
        assert!(snapshot.contains_key("sub/"));
        assert!(!snapshot.contains_key("sub/b.txt"));
        assert!(snapshot.get("sub/").unwrap().is_dir);
        assert_eq!(snapshot.get("sub/").unwrap().size, 0);
    }

    #[test]
    fn test_missing_bucket_dir_empties_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("bucket");
        fs::create_dir(&bucket).unwrap();
        fs::write(bucket.join("a.txt"), b"a").unwrap();

        let cache = MetadataCache::new();
        cache.scan_bucket("bucket", &bucket);
        fs::remove_dir_all(&bucket).unwrap();

        let stats = cache.scan_bucket("bucket", &bucket);
        assert_eq!(stats.removed, 1);
        assert!(cache.get_bucket("bucket").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_keeps_its_key() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("loop"), b"soon a link").unwrap();

        let cache = MetadataCache::new();
        cache.scan_bucket("docs", dir.path());
        let cached = cache.get_entry("docs", "loop").unwrap();

        // still present, but following it fails with ELOOP
        fs::remove_file(dir.path().join("loop")).unwrap();
        symlink("loop", dir.path().join("loop")).unwrap();
        let stats = cache.scan_bucket("docs", dir.path());
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.removed, 0);
        assert_eq!(cache.get_entry("docs", "loop").unwrap(), cached);

        // a dangling link is a deletion
        fs::remove_file(dir.path().join("loop")).unwrap();
        symlink("missing", dir.path().join("loop")).unwrap();
        let stats = cache.scan_bucket("docs", dir.path());
        assert_eq!(stats.removed, 1);
        assert!(cache.get_entry("docs", "loop").is_err());
        assert!(cache.get_entry("docs", "a.txt").is_ok());
    }
}
