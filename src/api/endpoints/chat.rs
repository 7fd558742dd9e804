//! Chat endpoints.
//!
//! - `POST /api/chat/message` — one assistant reply (not streaming)
//! - `GET /api/chat/suggestions` — starter questions

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::advisory::chat::{self, ChatTurn};
use crate::api::error::ApiError;
use crate::api::types::{blocking, ApiContext, ApiJson};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageResponse {
    pub response: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    pub conversation_id: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<&'static str>,
}

/// `POST /api/chat/message` — open. Upstream failures yield a canned reply.
pub async fn message(
    State(ctx): State<ApiContext>,
    ApiJson(req): ApiJson<ChatMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    let message = chat::validate(&req.message, &req.conversation_history)?;
    let conversation_id = req
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let advisor = ctx.core.advisor().clone();
    let history = req.conversation_history;
    let reply = blocking(move || Ok(chat::reply(&advisor, &message, &history))).await?;

    Ok(Json(ChatMessageResponse {
        response: reply.response,
        error: reply.error,
        conversation_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// `GET /api/chat/suggestions`
pub async fn suggestions() -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: chat::suggestions(),
    })
}
