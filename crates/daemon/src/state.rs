use std::path::PathBuf;
use std::sync::Arc;

use common::prelude::MetadataCache;

use crate::config::Config;

/// Shared state handed to every HTTP handler.
///
/// Handlers only read from the cache; scans are driven by the scheduler,
/// which holds its own handle to the same cache.
#[derive(Debug, Clone)]
pub struct State {
    cache: Arc<MetadataCache>,
    root: Arc<PathBuf>,
}

impl State {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            cache: Arc::new(MetadataCache::new()),
            root: Arc::new(root.into()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.root_path.clone())
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Filesystem location of an already-validated bucket key.
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket);
        for segment in key.split('/').filter(|segment| !segment.is_empty()) {
            path.push(segment);
        }
        path
    }
}
