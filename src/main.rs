mod command;
mod config;
mod dispatch;
mod github;
mod llm;
mod mail;
mod platform;
mod search;
mod services;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::github::GithubClient;
use crate::llm::LlmClient;
use crate::mail::SmtpMailer;
use crate::platform::telegram::TelegramRelay;
use crate::search::WebSearch;
use crate::webhook::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Model: {} at {}", config.llm.model, config.llm.api_url);
    info!("  GitHub owner: {}", config.github.owner);
    if config.github.token.is_none() {
        warn!("GITHUB_PAT not set; repository commands will reply with errors");
    }
    if config.telegram.bot_token.is_none() {
        warn!("TELEGRAM_BOT_TOKEN not set; replies cannot be delivered");
    }
    if config.email.host.is_none() {
        warn!("EMAIL_HOST not set; email commands will reply with errors");
    }

    let dispatcher = Dispatcher::new(
        Arc::new(LlmClient::new(config.llm.clone())?),
        Arc::new(GithubClient::new(&config.github)?),
        Arc::new(SmtpMailer::new(config.email.clone())),
        Arc::new(WebSearch::new(config.search.clone())?),
        config.github.owner.clone(),
    );
    let state = Arc::new(AppState {
        dispatcher,
        messenger: Arc::new(TelegramRelay::new(&config.telegram)?),
    });

    let app = webhook::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!("Relay listening on http://{}/webhook", config.server.bind);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
