use clap::Args;

use vedro_daemon::spawn_service;

/// Scan the root and serve it over the S3 API until signalled
#[derive(Args, Debug, Clone)]
pub struct Serve;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("config error: {0}")]
    Config(#[from] vedro_daemon::ConfigError),

    #[error("daemon failed: {0:#}")]
    Failed(#[from] anyhow::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.load_config()?;
        spawn_service(&config).await?;
        Ok("daemon ended".to_string())
    }
}
