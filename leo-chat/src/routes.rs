//! Route definitions for the Leo chat service.
//!
//! Provides the chat, reset, history, and health endpoints consumed by the
//! mobile app.

use crate::relay::ChatRelay;
use crate::session::Turn;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use leo_common::logging::generate_trace_id;
use leo_common::Error;
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::Instrument;

/// Shown to clients instead of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "Sorry, something went wrong on our side. Please try again.";

/// Body that could not be read or parsed as a chat/reset request.
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

/// Body over `chat.max_body_bytes`.
pub const BODY_TOO_LARGE_MESSAGE: &str = "Request body too large";

/// Chat request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Chat response body.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReplyResponse {
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

/// Reset request body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetBody {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub service: String,
    pub provider: String,
    pub status: String,
}

/// Session history response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// Error wrapper that renders the `{ success: false, error }` envelope.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error = match self.0.client_message() {
            Some(msg) if !status.is_server_error() => msg.to_string(),
            _ => {
                tracing::error!(error = %self.0, "Chat request failed");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error,
            }),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), error = %rejection.body_text(), "Rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self(Error::PayloadTooLarge(BODY_TOO_LARGE_MESSAGE.into()))
        } else {
            Self(Error::InvalidInput(INVALID_BODY_MESSAGE.into()))
        }
    }
}

/// Response for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError(Error::Internal(format!("handler panicked: {detail}"))).into_response()
}

/// Build the complete router for the chat service.
pub fn build_routes(relay: ChatRelay) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/reset", post(reset_handler))
        .route("/history/:session_id", get(history_handler))
        .merge(health_routes())
        .with_state(relay)
}

/// Build health check routes.
pub fn health_routes() -> Router<ChatRelay> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
}

async fn chat_handler(
    State(relay): State<ChatRelay>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReplyResponse>, ApiError> {
    let Json(body) = body?;

    let message = body.message.unwrap_or_default();
    let span = tracing::info_span!("chat_request", trace_id = %generate_trace_id());
    let reply = relay
        .send(&message, body.session_id.as_deref())
        .instrument(span)
        .await?;

    Ok(Json(ChatReplyResponse {
        success: true,
        response: reply.text,
        conversation_id: Some(reply.conversation_id),
        fallback: Some(reply.fallback),
    }))
}

async fn reset_handler(
    State(relay): State<ChatRelay>,
    body: Option<Json<ResetBody>>,
) -> Json<AckResponse> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    if let Some(session_id) = body.session_id.as_deref().map(str::trim) {
        if !session_id.is_empty() {
            relay.reset(session_id).await;
        }
    }

    Json(AckResponse { success: true })
}

async fn history_handler(
    State(relay): State<ChatRelay>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    let turns = relay.history(&session_id).await;
    Json(HistoryResponse {
        success: true,
        session_id,
        turns,
    })
}

async fn health_handler(State(relay): State<ChatRelay>) -> Json<HealthResponse> {
    let health = relay.health();
    Json(HealthResponse {
        success: true,
        service: health.service.into(),
        provider: health.provider.into(),
        status: health.status.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_keeps_message() {
        let response = ApiError(Error::InvalidInput("Message is required".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_error_is_500() {
        let response = ApiError(Error::Internal("lock poisoned".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_payload_too_large_keeps_message() {
        let response =
            ApiError(Error::PayloadTooLarge(BODY_TOO_LARGE_MESSAGE.into())).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_panic_response_is_500() {
        let response = panic_response(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(String::from("lock poisoned")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(42_u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_chat_body_accepts_camel_case() {
        let body: ChatBody =
            serde_json::from_str(r#"{"message": "hi", "sessionId": "abc"}"#).unwrap();
        assert_eq!(body.message.as_deref(), Some("hi"));
        assert_eq!(body.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_reply_serialization() {
        let json = serde_json::to_value(ChatReplyResponse {
            success: true,
            response: "hello".into(),
            conversation_id: Some("abc".into()),
            fallback: Some(false),
        })
        .unwrap();
        assert_eq!(json["conversationId"], "abc");
        assert_eq!(json["fallback"], false);
    }
}
