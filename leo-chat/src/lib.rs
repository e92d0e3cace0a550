//! Leo Chat - chat assistant relay for the Leo Clubs app.
//!
//! Keeps a short conversation history per session, forwards each message to
//! Gemini, and answers with a canned reply whenever the upstream call fails.
//!
//! ## Architecture
//!
//! ```text
//! App → POST /chat → ChatRelay (validate → prompt → Provider) → Gemini
//!                        ↓ success only
//!                   SessionStore
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod fallback;
pub mod prompt;
pub mod provider;
pub mod relay;
pub mod routes;
pub mod session;

pub use fallback::{FallbackReplies, FallbackSelector, FixedSelector, RandomSelector, SeededSelector};
pub use provider::{ChatRequest, ChatResponse, GeminiProvider, Provider, ProviderError};
pub use relay::{ChatRelay, HealthStatus, RelaySettings, Reply};
pub use session::{InMemorySessionStore, Role, SessionStore, Turn};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use leo_common::config::Config;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

/// Assemble the relay from configuration with the Gemini provider.
pub fn build_relay(config: &Config) -> leo_common::Result<ChatRelay> {
    let provider = GeminiProvider::new(&config.gemini)?;
    if !provider.has_api_key() {
        tracing::warn!("No Gemini API key configured; every chat will get a fallback reply");
    }

    let selector: Arc<dyn FallbackSelector> = match config.chat.fallback_seed {
        Some(seed) => Arc::new(SeededSelector::new(seed)),
        None => Arc::new(RandomSelector),
    };
    let fallback = FallbackReplies::new(config.chat.fallback_responses.clone(), selector);
    let store = InMemorySessionStore::new(config.chat.history_limit);

    tracing::debug!(
        history_limit = store.history_limit(),
        prompt_turns = config.chat.prompt_turns,
        fallback_replies = fallback.replies().len(),
        seeded = config.chat.fallback_seed.is_some(),
        "Chat relay configured"
    );

    Ok(ChatRelay::new(
        Arc::new(store),
        Arc::new(provider),
        fallback,
        RelaySettings::from_config(&config.chat, config.gemini.model.clone()),
    ))
}

/// Build the service router with all routes and middleware.
pub fn build_router(config: &Config) -> leo_common::Result<Router> {
    Ok(build_router_with(build_relay(config)?, config))
}

/// Build the router around an existing relay.
///
/// A panic inside a handler is answered with the generic 500 envelope.
pub fn build_router_with(relay: ChatRelay, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::build_routes(relay)
        .layer(DefaultBodyLimit::max(config.chat.max_body_bytes))
        .layer(CatchPanicLayer::custom(routes::panic_response))
        .layer(cors)
}

/// Start the chat server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = config.listen_address();
    let router = build_router(config)?;

    tracing::info!(model = %config.gemini.model, "Starting Leo chat service on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
