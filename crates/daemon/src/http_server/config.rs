use std::net::SocketAddr;

use crate::config::Config as DaemonConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
    // wrap the router in a request tracing layer
    pub request_logging: bool,
    // turn handler panics into 500 responses
    pub recover: bool,
}

impl Config {
    pub fn new(listen_addr: SocketAddr) -> Self {
        tracing::info!("Creating HTTP server Config: listen_addr={}", listen_addr);
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
            request_logging: true,
            recover: true,
        }
    }

    pub fn from_daemon_config(config: &DaemonConfig) -> Self {
        Self {
            request_logging: config.enable_request_logging,
            recover: config.enable_recover,
            ..Self::new(config.listen_addr)
        }
    }
}
