/**
 * Daemon configuration: file format, defaults
 *  and validation.
 */
pub mod config;
/**
 * The S3-compatible HTTP surface: bucket and object
 *  routes, XML rendering, health probes.
 */
pub mod http_server;
/**
 * Process lifecycle: logging, signal handling,
 *  and the startup/shutdown sequence.
 */
pub mod process;
/**
 * State shared between request handlers.
 */
pub mod state;
/**
 * Build metadata.
 */
pub mod version;

pub use config::{Config, ConfigError};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use state::State as ServiceState;
