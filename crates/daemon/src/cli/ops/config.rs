use clap::Args;

use vedro_daemon::ConfigError;

/// Print the effective configuration as TOML
#[derive(Args, Debug, Clone)]
pub struct ShowConfig;

#[async_trait::async_trait]
impl crate::cli::op::Op for ShowConfig {
    type Error = ConfigError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.load_config()?;
        config.to_toml()
    }
}
