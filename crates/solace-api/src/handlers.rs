//! Route handler functions for all API endpoints.
//!
//! Request bodies are parsed by hand so that any malformed or oversized
//! body is a 400 with an explanatory detail rather than axum's default
//! rejection.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use solace_chat::emotion::BATCH_VALIDATION_MESSAGE;
use solace_chat::{validate_session_id, ChatError, EMPTY_MESSAGE_REPLY};
use solace_core::types::Turn;

use crate::error::ApiError;
use crate::state::AppState;

/// Detail for a `/chat` body that is not `{"message": <string>}`.
pub const INVALID_CHAT_DETAIL: &str =
    "Invalid input. Please send a valid JSON with a 'message' field.";

/// Detail for an `/emotions` body that is not a JSON object with `texts`.
pub const INVALID_EMOTIONS_DETAIL: &str =
    "Invalid input. Please send a valid JSON with a 'texts' field.";

/// Greeting returned by `GET /`.
pub const WELCOME_MESSAGE: &str = "Welcome to the Mental Health Chatbot";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session: String,
    pub turns: Vec<Turn>,
    /// Last response while still fresh, otherwise null.
    pub last_response: Option<String>,
}

/// `texts` is checked separately so a wrong shape gets its own detail.
#[derive(Debug, Deserialize)]
pub struct EmotionsRequest {
    pub texts: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmotionsResponse {
    pub labels: Vec<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Buffered body, or a 400 with `detail` when it could not be read.
fn read_body(body: Result<Bytes, BytesRejection>, detail: &str) -> Result<Bytes, ApiError> {
    body.map_err(|e| {
        warn!(error = %e, "Unreadable request body");
        ApiError::BadRequest(detail.to_string())
    })
}

/// GET / - liveness check.
pub async fn root() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: WELCOME_MESSAGE.to_string(),
    })
}

/// POST /chat - answer one user message.
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let body = read_body(body, INVALID_CHAT_DETAIL)?;
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Invalid request format");
        ApiError::BadRequest(INVALID_CHAT_DETAIL.to_string())
    })?;

    let session = request
        .session
        .unwrap_or_else(|| state.default_session.to_string());
    validate_session_id(&session)?;

    let message = request.message.trim().to_string();
    if message.is_empty() {
        warn!(session = %session, "Empty message received");
        return Ok(Json(ChatReply {
            response: EMPTY_MESSAGE_REPLY.to_string(),
        }));
    }

    info!(session = %session, message = %message, "Received message");

    // Session setup is not covered by the orchestrator's containment; a
    // panic there surfaces as a JoinError.
    let registry = state.registry.clone();
    let task_session = session.clone();
    let response = tokio::spawn(async move {
        let orchestrator = registry.get_or_create(&task_session).await?;
        Ok::<_, ChatError>(orchestrator.generate_response(&message).await)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("dialogue task failed: {}", e)))??;

    info!(session = %session, response = %response, "Generated response");
    Ok(Json(ChatReply { response }))
}

/// GET /sessions/{id} - memory of one session.
pub async fn session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let orchestrator = state
        .registry
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session '{}' not found", id)))?;

    let snapshot = orchestrator.snapshot().await;
    Ok(Json(SessionInfo {
        session: id,
        turns: snapshot.turns,
        last_response: snapshot.last_response,
    }))
}

/// POST /emotions - top emotion label for each text.
pub async fn emotions(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<EmotionsResponse>, ApiError> {
    let body = read_body(body, INVALID_EMOTIONS_DETAIL)?;
    let request: EmotionsRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Invalid emotions request");
        ApiError::BadRequest(INVALID_EMOTIONS_DETAIL.to_string())
    })?;
    let texts: Vec<String> = serde_json::from_value(request.texts).map_err(|e| {
        warn!(error = %e, "Emotions request texts is not a list of strings");
        ApiError::BadRequest(BATCH_VALIDATION_MESSAGE.to_string())
    })?;

    let labels = state
        .registry
        .collaborators()
        .classifier
        .analyze_batch(&texts)
        .await?;

    Ok(Json(EmotionsResponse { labels }))
}
