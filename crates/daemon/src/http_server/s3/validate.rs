//! Request path checks.
//!
//! Bucket names and keys come straight from the request path and are later
//! joined onto the served root, so anything that could step outside a bucket
//! is rejected before the cache or the filesystem is consulted.

use super::error::S3Error;

fn is_forbidden_segment(segment: &str) -> bool {
    segment == "." || segment == ".." || segment.contains(['\\', '\0'])
}

pub fn bucket_name(bucket: &str) -> Result<(), S3Error> {
    if bucket.is_empty() || bucket.contains('/') || is_forbidden_segment(bucket) {
        return Err(S3Error::invalid_path(bucket, None));
    }
    Ok(())
}

/// Keys are `/`-separated relative paths. A single trailing `/` is allowed
/// and names a directory.
pub fn object_key(bucket: &str, key: &str) -> Result<(), S3Error> {
    bucket_name(bucket)?;

    let trimmed = key.strip_suffix('/').unwrap_or(key);
    let valid = !trimmed.is_empty()
        && trimmed
            .split('/')
            .all(|segment| !segment.is_empty() && !is_forbidden_segment(segment));
    if !valid {
        return Err(S3Error::invalid_path(bucket, Some(key)));
    }
    Ok(())
}
