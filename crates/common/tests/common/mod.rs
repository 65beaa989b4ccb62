//! Shared helpers for building scratch directory trees in cache tests
#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

/// A temporary served root. Every top-level directory is a bucket.
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn bucket(&self, bucket: &str) -> PathBuf {
        let path = self.dir.path().join(bucket);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Write `content` at `bucket/key`, creating parent directories.
    pub fn write(&self, bucket: &str, key: &str, content: &[u8]) -> PathBuf {
        let path = self.bucket(bucket).join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn mkdir(&self, bucket: &str, key: &str) -> PathBuf {
        let path = self.bucket(bucket).join(key);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn remove(&self, bucket: &str, key: &str) {
        let path = self.dir.path().join(bucket).join(key);
        if path.is_dir() {
            fs::remove_dir_all(path).unwrap();
        } else {
            fs::remove_file(path).unwrap();
        }
    }
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

pub fn epoch_secs(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}
