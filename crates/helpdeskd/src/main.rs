//! Helpdesk daemon entry point.

use anyhow::Result;
use helpdeskd::config::{Config, CONFIG_PATH};
use helpdeskd::orchestrator::OllamaClient;
use helpdeskd::server::{self, AppState};
use helpdeskd::tools::Toolbox;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("helpdeskd v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::var("HELPDESKD_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
    let config = Config::load(Path::new(&config_path))?;

    let llm = Arc::new(OllamaClient::new(
        &config.llm.base_url,
        &config.llm.model,
        Duration::from_secs(config.llm.timeout_secs),
        &config.llm.keep_alive,
    ));
    if !llm.is_available().await {
        warn!(
            "model backend at {} is unreachable, requests will fail until it is up",
            config.llm.base_url
        );
    }

    let tools = Arc::new(Toolbox::new(&config));
    let state = AppState::new(config, llm, tools);

    server::run(state).await
}
