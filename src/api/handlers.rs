use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    ContentReference, InteractionRecord, PreferenceProfile, Recommendation, TwinContext,
};

use super::AppState;

const DEFAULT_LIMIT: usize = 10;
const MIN_LIMIT: usize = 1;
const MAX_LIMIT: usize = 50;
const MAX_MESSAGE_CHARS: usize = 1000;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    #[serde(default)]
    pub preference_profile: PreferenceProfile,
    #[serde(default)]
    pub interaction_history: Vec<InteractionRecord>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub recommendations: Vec<Recommendation>,
    pub count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct TwinMessageRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub context: TwinContext,
}

#[derive(Debug, Serialize)]
pub struct TwinMessageResponse {
    pub user_id: String,
    pub response: String,
    pub content_references: Vec<ContentReference>,
    pub response_time: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvalidateCacheRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "ghostypedia-ai" }))
}

/// Generates up to `limit` recommendations for a user
pub async fn generate_recommendations(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&request.limit) {
        return Err(AppError::InvalidInput(
            "limit must be between 1 and 50".to_string(),
        ));
    }

    let recommendations = state
        .engine
        .generate_recommendations(
            &request.user_id,
            &request.preference_profile,
            &request.interaction_history,
            request.limit,
        )
        .await;

    let count = recommendations.len();
    Ok(Json(RecommendationResponse {
        user_id: request.user_id,
        recommendations,
        count,
        generated_at: Utc::now(),
    }))
}

/// Sends one message to the digital twin
///
/// Twin generation failures are intentionally surfaced as 200 "soft"
/// responses carrying the degraded reply and its `error` field, never as an
/// error status. Only input validation rejects the request.
pub async fn twin_message(
    State(state): State<AppState>,
    Json(request): Json<TwinMessageRequest>,
) -> AppResult<Json<TwinMessageResponse>> {
    if request.user_id.trim().is_empty() {
        return Err(AppError::InvalidInput("user_id is required".to_string()));
    }
    if request.message.is_empty() {
        return Err(AppError::InvalidInput("message is required".to_string()));
    }
    if request.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::InvalidInput(
            "message must be 1000 characters or less".to_string(),
        ));
    }

    let reply = state
        .twin
        .generate_response(&request.user_id, &request.message, &request.context)
        .await;

    Ok(Json(TwinMessageResponse {
        user_id: request.user_id,
        response: reply.response,
        content_references: reply.content_references,
        response_time: reply.response_time,
        success: reply.success,
        error: reply.error,
    }))
}

/// Invalidates cached recommendations for one user, or for everyone when no
/// user is given
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Json(request): Json<InvalidateCacheRequest>,
) -> Json<Value> {
    state
        .engine
        .invalidate_cache(request.user_id.as_deref())
        .await;
    Json(json!({ "status": "ok" }))
}
