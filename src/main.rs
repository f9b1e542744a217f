use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use modoc_backend::{
    config::AppConfig,
    logger,
    routes,
    services::{
        gemini::GeminiClient,
        model_client::{ModelClient, RetryingModelClient},
    },
    state::{AppState, SharedState},
};
use tower_http::cors::CorsLayer;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init_logger();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let gemini = GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        &config.gemini_api_key,
        config.request_timeout,
    )
    .context("failed to build model client")?;

    let model: Arc<dyn ModelClient> = if config.retry.max_retries > 0 {
        Arc::new(RetryingModelClient::new(Arc::new(gemini), config.retry))
    } else {
        Arc::new(gemini)
    };

    let state: SharedState = Arc::new(
        AppState::new(model, config.session_ttl)
            .with_max_transcript(config.max_transcript_len)
            .with_history_policy(config.history_policy)
            .with_admin_key(config.admin_key.clone()),
    );

    spawn_session_purge(state.clone());

    let app = routes::create_router(state).layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        model = %config.gemini_model,
        history = ?config.history_policy,
        "MoDoc assistant listening"
    );
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn spawn_session_purge(state: SharedState) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = state.sessions.purge_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "purged idle chat sessions");
            }
        }
    });
}
