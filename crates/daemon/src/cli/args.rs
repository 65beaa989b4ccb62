pub use clap::Parser;

use std::net::SocketAddr;
use std::path::PathBuf;

use vedro_daemon::Config;

#[derive(Parser, Debug)]
#[command(name = "vedrod")]
#[command(about = "Read-only S3-compatible gateway over a local directory tree")]
pub struct Args {
    /// Path to a TOML config file (built-in defaults if not set)
    #[arg(short, long, global = true, env = "VEDRO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: crate::Command,
}

/// Flags that take precedence over the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Directory whose subdirectories are served as buckets
    #[arg(long, global = true, env = "VEDRO_ROOT")]
    pub root: Option<PathBuf>,

    /// Address for the S3 HTTP server
    #[arg(long, global = true, env = "VEDRO_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Seconds between full rescans
    #[arg(long, global = true, env = "VEDRO_SCAN_INTERVAL")]
    pub scan_interval: Option<u64>,

    /// Default log level (RUST_LOG still wins)
    #[arg(long, global = true, env = "VEDRO_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long, global = true, env = "VEDRO_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Disable per-request tracing
    #[arg(long, global = true)]
    pub no_request_logging: bool,

    /// Let handler panics drop the connection instead of returning 500
    #[arg(long, global = true)]
    pub no_recover: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.root_path = root.clone();
        }
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(secs) = self.scan_interval {
            config.scan_interval_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if self.no_request_logging {
            config.enable_request_logging = false;
        }
        if self.no_recover {
            config.enable_recover = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config = Config::default();
        let overrides = ConfigOverrides {
            root: Some(PathBuf::from("/srv/buckets")),
            listen: Some("127.0.0.1:9000".parse().unwrap()),
            scan_interval: Some(5),
            no_recover: true,
            ..ConfigOverrides::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.root_path, PathBuf::from("/srv/buckets"));
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.scan_interval_secs, 5);
        assert!(!config.enable_recover);
        assert!(config.enable_request_logging);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_overrides_change_nothing() {
        let mut config = Config::default();
        ConfigOverrides::default().apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
