use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use http::StatusCode;
use serde::Deserialize;

use common::prelude::{BucketSnapshot, Entry};

use super::error::S3Error;
use super::xml::{xml_response, XmlWriter};
use super::{iso8601, validate};
use crate::ServiceState;

pub const DEFAULT_MAX_KEYS: usize = 1000;

const STORAGE_CLASS: &str = "STANDARD";

#[derive(Debug, Default, Deserialize)]
pub struct ListObjectsQuery {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default, rename = "max-keys")]
    pub max_keys: Option<usize>,
}

/// One page of a bucket listing. Only files are listed; directory keys
/// stay in the cache and still answer object requests.
#[derive(Debug)]
pub struct Listing<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub max_keys: usize,
    pub is_truncated: bool,
    pub contents: Vec<(&'a str, &'a Entry)>,
}

impl<'a> Listing<'a> {
    pub fn new(snapshot: &'a BucketSnapshot, prefix: &'a str, max_keys: usize) -> Self {
        let mut contents: Vec<_> = snapshot
            .sorted_with_prefix(prefix)
            .into_iter()
            .filter(|(_, entry)| !entry.is_dir)
            .collect();
        let is_truncated = contents.len() > max_keys;
        contents.truncate(max_keys);
        Self {
            bucket: snapshot.name(),
            prefix,
            max_keys,
            is_truncated,
            contents,
        }
    }

    pub fn render(&self) -> String {
        let mut xml = XmlWriter::new();
        xml.root("ListBucketResult")
            .element("Name", self.bucket)
            .element("Prefix", self.prefix)
            .element("KeyCount", self.contents.len().to_string())
            .element("MaxKeys", self.max_keys.to_string())
            .element("IsTruncated", self.is_truncated.to_string());
        for (key, entry) in &self.contents {
            xml.open("Contents")
                .element("Key", key)
                .element("LastModified", iso8601(&entry.last_modified))
                .element("ETag", entry.fingerprint.as_str())
                .element("Size", entry.size.to_string())
                .element("StorageClass", STORAGE_CLASS)
                .close("Contents");
        }
        xml.close("ListBucketResult");
        xml.finish()
    }
}

#[tracing::instrument(skip(state, query))]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(bucket): Path<String>,
    query: Result<Query<ListObjectsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, S3Error> {
    validate::bucket_name(&bucket)?;
    let Query(query) = query.map_err(|e| S3Error::InvalidArgument(e.body_text()))?;

    let snapshot = state.cache().get_bucket(&bucket)?;
    let prefix = query.prefix.as_deref().unwrap_or("");
    let max_keys = query.max_keys.unwrap_or(DEFAULT_MAX_KEYS);

    let listing = Listing::new(&snapshot, prefix, max_keys);
    tracing::debug!(
        keys = listing.contents.len(),
        truncated = listing.is_truncated,
        "listed bucket"
    );
    Ok(xml_response(StatusCode::OK, listing.render()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use common::prelude::MetadataCache;

    use super::*;

    fn scanned_bucket() -> (tempfile::TempDir, BucketSnapshot) {
        let dir = tempfile::tempdir().unwrap();
        let bucket = dir.path().join("photos");
        fs::create_dir_all(bucket.join("2024")).unwrap();
        fs::write(bucket.join("2024").join("b.jpg"), b"bb").unwrap();
        fs::write(bucket.join("2024").join("a.jpg"), b"a").unwrap();
        fs::write(bucket.join("cover.png"), b"ccc").unwrap();

        let cache = MetadataCache::new();
        cache.scan_all(dir.path()).unwrap();
        let snapshot = cache.get_bucket("photos").unwrap();
        (dir, snapshot)
    }

    #[test]
    fn test_listing_is_sorted_and_filtered() {
        let (_dir, snapshot) = scanned_bucket();

        let listing = Listing::new(&snapshot, "", DEFAULT_MAX_KEYS);
        let keys: Vec<_> = listing.contents.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["2024/a.jpg", "2024/b.jpg", "cover.png"]);
        assert!(!listing.is_truncated);

        let listing = Listing::new(&snapshot, "2024/", DEFAULT_MAX_KEYS);
        assert_eq!(listing.contents.len(), 2);
    }

    #[test]
    fn test_listing_skips_directories() {
        let (_dir, snapshot) = scanned_bucket();
        assert!(snapshot.get("2024/").unwrap().is_dir);

        let listing = Listing::new(&snapshot, "2024", DEFAULT_MAX_KEYS);
        assert!(listing.contents.iter().all(|(_, entry)| !entry.is_dir));

        let xml = listing.render();
        assert!(xml.contains("<KeyCount>2</KeyCount>"));
        assert!(!xml.contains("<Key>2024/</Key>"));
        assert!(!xml.contains("<Size>0</Size>"));
    }

    #[test]
    fn test_listing_truncates_at_max_keys() {
        let (_dir, snapshot) = scanned_bucket();

        let listing = Listing::new(&snapshot, "", 2);
        assert_eq!(listing.contents.len(), 2);
        assert!(listing.is_truncated);

        let xml = listing.render();
        assert!(xml.contains("<IsTruncated>true</IsTruncated>"));
        assert!(xml.contains("<MaxKeys>2</MaxKeys>"));
        assert!(xml.contains("<Key>2024/a.jpg</Key>"));
        assert!(!xml.contains("cover.png"));
    }

    #[test]
    fn test_render_contents() {
        let (_dir, snapshot) = scanned_bucket();
        let entry = snapshot.get("cover.png").unwrap();

        let xml = Listing::new(&snapshot, "cover", DEFAULT_MAX_KEYS).render();
        assert!(xml.contains("<Name>photos</Name>"));
        assert!(xml.contains("<Prefix>cover</Prefix>"));
        assert!(xml.contains("<Size>3</Size>"));
        assert!(xml.contains("<StorageClass>STANDARD</StorageClass>"));
        let etag = entry.fingerprint.as_str().replace('"', "&quot;");
        assert!(xml.contains(&format!("<ETag>{etag}</ETag>")));
    }
}
