//! HTTP server for helpdeskd.

use crate::cache::AnswerCache;
use crate::config::Config;
use crate::orchestrator::{AnswerEngine, LlmClient};
use crate::rate_limit::TokenBucketLimiter;
use crate::routes;
use crate::telemetry::Recorder;
use crate::tools::ToolExecutor;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers. Built once at process start
/// and passed by handle, so the stateful services are substitutable.
pub struct AppState {
    pub config: Config,
    pub limiter: TokenBucketLimiter,
    pub cache: AnswerCache,
    pub engine: AnswerEngine,
    pub recorder: Recorder,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolExecutor>) -> Self {
        let limiter = TokenBucketLimiter::new(
            config.limiter.max_tokens,
            Duration::from_secs(config.limiter.window_secs),
        );
        let cache = AnswerCache::new(
            config.cache.capacity,
            Duration::from_secs(config.cache.ttl_secs),
        );
        Self {
            limiter,
            cache,
            engine: AnswerEngine::new(llm, tools),
            recorder: Recorder::new(),
            start_time: Instant::now(),
            config,
        }
    }
}

/// Run the HTTP server until shutdown.
pub async fn run(state: AppState) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let state = Arc::new(state);

    let app = axum::Router::new()
        .merge(routes::ask_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("  Listening on http://{}", bind);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down gracefully");
    })
    .await?;
    Ok(())
}
