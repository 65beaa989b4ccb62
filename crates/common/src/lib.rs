/**
 * Content fingerprints for files and directories.
 *  Used verbatim as the S3 `ETag` of an object.
 */
pub mod fingerprint;
/**
 * The in-memory index of every bucket, key and
 *  entry under the served root. Refreshed by scans,
 *  read by the HTTP layer.
 */
pub mod cache;
/**
 * Drives the cache's full scans: once at startup,
 *  then on a fixed interval, never overlapping.
 */
pub mod scheduler;

pub mod prelude {
    pub use crate::cache::{
        BucketSnapshot, CacheError, Entry, MetadataCache, ScanReport, ScanStats,
    };
    pub use crate::fingerprint::{Fingerprint, FingerprintError};
    pub use crate::scheduler::{ScanScheduler, ScanTaskError};
}
