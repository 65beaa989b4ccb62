use std::path::PathBuf;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::cache::{CacheError, MetadataCache, ScanReport};

/// Runs [`MetadataCache::scan_all`] at startup and then on a fixed interval.
///
/// Scans run on the blocking thread pool. The loop awaits each scan before
/// it looks at the timer again, so at most one scan is in flight and ticks
/// missed while scanning are not replayed.
#[derive(Debug, Clone)]
pub struct ScanScheduler {
    cache: Arc<MetadataCache>,
    root: PathBuf,
    period: Duration,
    #[cfg(test)]
    in_flight: Arc<InFlight>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanTaskError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ScanScheduler {
    pub fn new(cache: Arc<MetadataCache>, root: impl Into<PathBuf>, period: Duration) -> Self {
        Self {
            cache,
            root: root.into(),
            period,
            #[cfg(test)]
            in_flight: Arc::default(),
        }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    /// Run one full scan to completion.
    pub async fn scan_once(&self) -> Result<ScanReport, ScanTaskError> {
        #[cfg(test)]
        let _running = InFlight::enter(&self.in_flight);
        let cache = self.cache.clone();
        let root = self.root.clone();
        let report = tokio::task::spawn_blocking(move || cache.scan_all(&root)).await??;
        Ok(report)
    }

    /// The startup scan. Failures are logged and returned; the periodic loop
    /// retries on its next tick either way.
    pub async fn initial_scan(&self) -> Result<ScanReport, ScanTaskError> {
        tracing::info!(root = %self.root.display(), "running initial scan");
        let result = self.scan_once().await;
        log_outcome(&result);
        result
    }

    /// Rescan every `period` until `shutdown_rx` fires.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<()>) {
        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        timer.tick().await;

        tracing::info!(
            root = %self.root.display(),
            period_secs = self.period.as_secs(),
            "periodic scanner started"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    tracing::debug!("starting periodic scan");
                    let result = self.scan_once().await;
                    log_outcome(&result);
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("periodic scanner shutting down");
                    break;
                }
            }
        }
    }
}

fn log_outcome(result: &Result<ScanReport, ScanTaskError>) {
    match result {
        Ok(report) => tracing::info!(
            buckets = report.buckets,
            pruned_buckets = report.pruned_buckets,
            fingerprinted = report.totals.fingerprinted,
            unchanged = report.totals.unchanged,
            removed = report.totals.removed,
            errors = report.totals.errors,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scan completed"
        ),
        Err(e) => tracing::error!(error = %e, "scan failed, keeping previous index"),
    }
}

/// Counts overlapping and total calls to `scan_once`.
#[cfg(test)]
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
    runs: AtomicUsize,
}

#[cfg(test)]
struct InFlightGuard(Arc<InFlight>);

#[cfg(test)]
impl InFlight {
    fn enter(this: &Arc<Self>) -> InFlightGuard {
        let current = this.current.fetch_add(1, Ordering::SeqCst) + 1;
        this.peak.fetch_max(current, Ordering::SeqCst);
        this.runs.fetch_add(1, Ordering::SeqCst);
        InFlightGuard(this.clone())
    }
}

#[cfg(test)]
impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}
