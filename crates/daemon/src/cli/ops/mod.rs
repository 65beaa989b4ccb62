pub mod config;
pub mod serve;
pub mod version;

pub use config::ShowConfig;
pub use serve::Serve;
pub use version::Version;
