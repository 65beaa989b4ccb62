pub mod utils;

use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use common::prelude::ScanScheduler;

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

const LOG_FILE_PREFIX: &str = "vedrod.log";

use crate::config::Config;
use crate::http_server;
use crate::ServiceState;

/// Handle for gracefully shutting down the daemon service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) -> anyhow::Result<()> {
        shutdown_and_join(self.graceful_waiter, self.handles).await
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging, panic handler, and build info reporting.
/// Returns guards that must be kept alive for the duration of the program.
pub fn init_logging(
    config: &Config,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let level = config.tracing_level()?;
    let mut guards = Vec::new();

    // Stdout layer
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(stdout_env_filter);

    // File layer (if log_dir is set)
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let file_env_filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(file_env_filter);

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry().with(stdout_layer).try_init()?;
    }

    utils::register_panic_logger();
    utils::report_build_info();

    Ok(guards)
}

/// Wait for shutdown and join all handles with timeout.
async fn shutdown_and_join(
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
) -> anyhow::Result<()> {
    let _ = graceful_waiter.await;

    timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .with_context(|| {
            format!(
                "failed to shut down within {} seconds",
                FINAL_SHUTDOWN_TIMEOUT.as_secs()
            )
        })?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Build the index, then spawn the periodic scanner and the S3 server.
///
/// The initial scan runs to completion before the server binds, so the first
/// request already sees a populated index. If it fails the server still
/// starts; `/_status/readyz` reports 503 until a periodic scan succeeds.
pub async fn start_service(config: &Config) -> anyhow::Result<(ServiceState, ShutdownHandle)> {
    config.validate()?;

    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker()
        .context("failed to install signal handlers")?;
    let state = ServiceState::from_config(config);

    let scheduler = ScanScheduler::new(
        state.cache().clone(),
        config.root_path.clone(),
        config.scan_interval(),
    );
    if scheduler.initial_scan().await.is_err() {
        tracing::warn!(
            root = %config.root_path.display(),
            "serving an empty index until a scan succeeds"
        );
    }

    let mut handles = Vec::new();

    let scan_rx = shutdown_rx.clone();
    let scan_handle = tokio::spawn(async move {
        scheduler.run(scan_rx).await;
    });
    handles.push(scan_handle);

    let http_config = http_server::Config::from_daemon_config(config);
    let http_state = state.clone();
    let http_rx = shutdown_rx.clone();
    let http_shutdown_tx = shutdown_tx.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = http_server::run(http_config, http_state, http_rx).await {
            tracing::error!("S3 server error: {}", e);
            // nothing left to serve
            let _ = http_shutdown_tx.send(());
        }
    });
    handles.push(http_handle);

    tracing::info!(
        root = %config.root_path.display(),
        addr = %config.listen_addr,
        scan_interval_secs = config.scan_interval_secs,
        "Running: scanner + S3 server"
    );

    let handle = ShutdownHandle {
        graceful_waiter,
        handles,
        shutdown_tx,
    };

    Ok((state, handle))
}

/// Spawns the daemon service: periodic scanner + S3 server.
/// Blocks until shutdown signal is received. Use for CLI binary usage.
pub async fn spawn_service(config: &Config) -> anyhow::Result<()> {
    let _guards = init_logging(config)?;
    let (_, handle) = start_service(config).await?;
    handle.wait().await
}
