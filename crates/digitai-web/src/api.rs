//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use digitai::assets::WebManifest;
use digitai::relay::RelayReply;
use digitai::{ChatTurn, GeminiClient, GenerateContentRequest, GenerationConfig};
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::RelayError;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the server was started without an API key.
    pub gemini: Option<Arc<GeminiClient>>,
    pub generation: GenerationConfig,
    pub fallback_message: Arc<str>,
}

/// Request body for POST /api/chat.
///
/// Both fields are optional here; a missing one is reported with the relay's
/// own 400 body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub messages: Option<Vec<ChatTurn>>,
    pub system_prompt: Option<String>,
}

/// POST /api/chat: Forward a conversation to the upstream model.
///
/// The body is parsed as JSON whatever the `Content-Type` header says.
/// Returns `{message}` on success. Validation fails with 400, a missing key
/// or any upstream problem with 500; the upstream body is logged, never
/// returned.
pub async fn post_chat(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<RelayReply>, RelayError> {
    let body: ChatBody = serde_json::from_slice(&body).map_err(|e| {
        debug!("rejected chat body: {e}");
        RelayError::BadRequest
    })?;

    let (Some(messages), Some(system_prompt)) = (
        body.messages,
        body.system_prompt.filter(|prompt| !prompt.is_empty()),
    ) else {
        return Err(RelayError::BadRequest);
    };

    let Some(gemini) = app.gemini.as_deref() else {
        error!("chat request received but no API key is configured");
        return Err(RelayError::MissingApiKey);
    };

    debug!(
        "relaying {} messages ({} chars of system prompt) to {}",
        messages.len(),
        system_prompt.len(),
        gemini.model()
    );

    let request =
        GenerateContentRequest::from_turns(&messages, &system_prompt, app.generation.clone());

    let response = gemini.generate(&request).await.map_err(|e| {
        let err = RelayError::from(e);
        match &err {
            RelayError::Upstream { status, body } => {
                error!("Gemini API error (HTTP {status}): {body}");
            }
            RelayError::Internal(source) => error!("chat relay error: {source}"),
            _ => {}
        }
        err
    })?;

    let message = match response.first_text() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            debug!("upstream returned no text; sending fallback reply");
            app.fallback_message.to_string()
        }
    };

    Ok(Json(RelayReply { message }))
}

/// GET /health: Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /manifest.webmanifest: The PWA manifest.
pub async fn manifest() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        Json(WebManifest::default()),
    )
}
