use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ROOT_PATH: &str = "/var/vedra";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 30;

/// Daemon configuration, read from an optional TOML file.
///
/// Every field has a default, so an empty file (or no file at all) is a
/// valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory whose subdirectories are served as buckets
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,
    /// Address for the S3 HTTP server
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Seconds between two full rescans of `root_path`
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Emit a tracing span per HTTP request
    #[serde(default = "default_true")]
    pub enable_request_logging: bool,
    /// Turn handler panics into 500 responses instead of dropping the connection
    #[serde(default = "default_true")]
    pub enable_recover: bool,
    /// Default log level (error, warn, info, debug, trace); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily-rolling log files (stdout only if not set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT_PATH)
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
}

fn default_scan_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            listen_addr: default_listen_addr(),
            scan_interval_secs: default_scan_interval_secs(),
            enable_request_logging: true,
            enable_recover: true,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from `path`, or fall back to the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Check the values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::ZeroScanInterval);
        }
        self.tracing_level()?;
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Render as TOML, the same format `load` reads.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("scan interval must be at least one second")]
    ZeroScanInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.root_path, PathBuf::from("/var/vedra"));
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.scan_interval(), Duration::from_secs(30));
        assert!(config.enable_request_logging);
        assert!(config.enable_recover);
        assert_eq!(config.tracing_level().unwrap(), tracing::Level::INFO);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            root_path = "/srv/data"
            scan_interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.root_path, PathBuf::from("/srv/data"));
        assert_eq!(config.scan_interval_secs, 5);
        assert_eq!(config.listen_addr, default_listen_addr());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Config::parse("root = \"/srv\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_from_file_round_trips_through_render() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vedro.toml");
        let mut config = Config::default();
        config.listen_addr = "127.0.0.1:9000".parse().unwrap();
        config.log_dir = Some(dir.path().join("logs"));
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            scan_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroScanInterval)
        ));

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }
}
