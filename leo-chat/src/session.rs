//! Per-session conversation history.
//!
//! Sessions are keyed by an opaque id and hold user/assistant turn pairs.
//! A session exists only once it has at least one successful exchange.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Storage for session histories.
///
/// Implementations must apply `append_exchange` atomically: the pair is added
/// and the history truncated in one step, so concurrent appends to the same
/// session never lose a pair.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Snapshot of a session's turns, oldest first. Empty when absent.
    async fn history(&self, session_id: &str) -> Vec<Turn>;

    /// Append a user/assistant pair, evicting the oldest pairs past the limit.
    async fn append_exchange(&self, session_id: &str, user: String, assistant: String);

    /// Delete a session. Returns whether it existed.
    async fn reset(&self, session_id: &str) -> bool;

    /// Number of sessions currently holding history.
    async fn session_count(&self) -> usize;
}

/// Process-local session store.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Turn>>>>,
    history_limit: usize,
}

impl InMemorySessionStore {
    /// Create a store keeping at most `history_limit` turns per session.
    ///
    /// Odd limits round down so histories always hold whole pairs; the
    /// smallest usable limit is one pair.
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            history_limit: (history_limit - history_limit % 2).max(2),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(20)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn append_exchange(&self, session_id: &str, user: String, assistant: String) {
        let mut sessions = self.sessions.write().await;
        let turns = sessions.entry(session_id.to_string()).or_default();
        turns.push(Turn::user(user));
        turns.push(Turn::assistant(assistant));

        if turns.len() > self.history_limit {
            let excess = turns.len() - self.history_limit;
            turns.drain(..excess);
        }
    }

    async fn reset(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
