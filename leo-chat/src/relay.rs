//! Chat session relay.
//!
//! Validates the message, assembles a prompt from recent history, calls the
//! provider once, and either records the exchange or answers with a canned
//! fallback. Provider failures never reach the caller.

use crate::fallback::FallbackReplies;
use crate::prompt::build_prompt;
use crate::provider::{ChatRequest, Provider};
use crate::session::{SessionStore, Turn};
use leo_common::config::ChatConfig;
use leo_common::util::{sanitize_for_log, truncate_with_ellipsis};
use leo_common::{Error, Result};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub conversation_id: String,
    /// True when `text` is a canned reply because the provider failed.
    pub fallback: bool,
}

/// Constant service descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub service: &'static str,
    pub provider: &'static str,
    pub status: &'static str,
}

pub const HEALTH: HealthStatus = HealthStatus {
    service: "Leo Chat Assistant",
    provider: "Google Gemini",
    status: "running",
};

/// Prompt and history settings for the relay.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub model: String,
    pub system_prompt: String,
    pub prompt_turns: usize,
}

impl RelaySettings {
    pub fn from_config(chat: &ChatConfig, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: chat.system_prompt.clone(),
            prompt_turns: chat.prompt_turns,
        }
    }
}

/// The chat relay. Cheap to clone; all state sits behind `Arc`s.
#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn Provider>,
    fallback: FallbackReplies,
    settings: RelaySettings,
}

impl ChatRelay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn Provider>,
        fallback: FallbackReplies,
        settings: RelaySettings,
    ) -> Self {
        Self {
            store,
            provider,
            fallback,
            settings,
        }
    }

    /// Send a user message and get the assistant's reply.
    ///
    /// Only `InvalidInput` is ever returned as an error. A missing or blank
    /// `session_id` gets a fresh UUID, so such calls never share history.
    pub async fn send(&self, message: &str, session_id: Option<&str>) -> Result<Reply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("Message is required".into()));
        }

        let session_id = match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let history = self.store.history(&session_id).await;
        let prompt = build_prompt(
            &self.settings.system_prompt,
            &history,
            message,
            self.settings.prompt_turns,
        );

        tracing::debug!(
            session_id = %session_id,
            history_turns = history.len(),
            message = %truncate_with_ellipsis(message, 80),
            "Forwarding chat message"
        );

        match self
            .provider
            .chat(ChatRequest::single(&self.settings.model, prompt))
            .await
        {
            Ok(response) => {
                self.store
                    .append_exchange(&session_id, message.to_string(), response.content.clone())
                    .await;

                tracing::info!(
                    session_id = %session_id,
                    provider = %response.provider,
                    finish_reason = ?response.finish_reason,
                    latency_ms = response.latency_ms,
                    output_tokens = response.usage.output_tokens,
                    fallback = false,
                    "Chat reply generated"
                );

                Ok(Reply {
                    text: response.content,
                    conversation_id: session_id,
                    fallback: false,
                })
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %session_id,
                    provider = %e.provider,
                    status = ?e.status_code,
                    timed_out = e.is_timeout(),
                    error = %sanitize_for_log(&e.message),
                    fallback = true,
                    "Upstream model call failed, using fallback reply"
                );

                Ok(Reply {
                    text: self.fallback.choose().to_string(),
                    conversation_id: session_id,
                    fallback: true,
                })
            }
        }
    }

    /// Forget a session. Unknown ids are fine.
    pub async fn reset(&self, session_id: &str) {
        let existed = self.store.reset(session_id).await;
        let active_sessions = self.store.session_count().await;
        tracing::info!(
            session_id = %session_id,
            existed,
            active_sessions,
            "Chat session reset"
        );
    }

    /// Current turns for a session, oldest first.
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.store.history(session_id).await
    }

    pub fn health(&self) -> HealthStatus {
        HEALTH
    }
}
