use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;

use common::prelude::MetadataCache;

use crate::ServiceState;

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("the initial scan has not completed")]
    IndexNotReady,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

struct CacheSource {
    cache: Arc<MetadataCache>,
}

#[async_trait]
impl DataSource for CacheSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        if self.cache.is_ready() {
            Ok(())
        } else {
            Err(DataSourceError::IndexNotReady)
        }
    }
}

#[async_trait]
impl FromRequestParts<ServiceState> for StateDataSource {
    type Rejection = ();

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(CacheSource {
            cache: state.cache().clone(),
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Clone)]
    pub(crate) enum MockReadiness {
        IndexNotReady,
        Ready,
    }

    #[async_trait]
    impl DataSource for MockReadiness {
        async fn is_ready(&self) -> Result<(), DataSourceError> {
            use MockReadiness::*;

            match self {
                IndexNotReady => Err(DataSourceError::IndexNotReady),
                Ready => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_cache_source_tracks_first_scan() {
        let dir = tempfile::tempdir().unwrap();
        let source = CacheSource {
            cache: Arc::new(MetadataCache::new()),
        };
        assert!(matches!(
            source.is_ready().await,
            Err(DataSourceError::IndexNotReady)
        ));

        source.cache.scan_all(dir.path()).unwrap();
        assert!(source.is_ready().await.is_ok());
    }
}
