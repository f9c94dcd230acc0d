//! Serve command handler.

use crate::server;
use clap::Args;
use codelogic_core::config::AppConfig;

/// Run the HTTP chat endpoint
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Socket address to bind (overrides server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(ref bind) = self.bind {
            config.server.bind = bind.clone();
        }

        config.validate()?;

        tracing::info!("Starting chat server on {}", config.server.bind);
        server::run_server(&config).await
    }
}
