//! HTTP API server
//!
//! Exposes the generation, preferences, and diversity-summary surfaces.
//! Diversity exhaustion maps to 422 with a structured body so callers can
//! present "try again" UX; it is a designed rejection, not a server error.

use super::state::AppState;
use crate::error::RepertoireError;
use crate::generation::{GenerationOutcome, GenerationRequest};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

/// Error wrapper mapping domain errors onto HTTP responses
struct ApiError(RepertoireError);

impl From<RepertoireError> for ApiError {
    fn from(err: RepertoireError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            RepertoireError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            RepertoireError::RecipeNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RepertoireError::Generation(_) => (StatusCode::BAD_GATEWAY, "generation"),
            RepertoireError::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding"),
            RepertoireError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = json!({
            "success": false,
            "error": kind,
            "message": self.0.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct GenerateSuccess<'a> {
    success: bool,
    recipe_id: String,
    recipe: &'a crate::types::RecipeDraft,
    metadata: &'a crate::generation::GenerationMetadata,
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/recipes/generate", post(generate_handler))
        .route(
            "/users/:user_id/preferences",
            get(get_preferences_handler)
                .patch(update_preferences_handler)
                .delete(delete_preferences_handler),
        )
        .route("/users/:user_id/diversity", get(diversity_summary_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the server until shutdown
pub async fn serve(state: AppState, config: ApiServerConfig) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("API server listening on {}", config.addr);
    axum::serve(listener, router).await?;
    Ok(())
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.orchestrator.generate(request).await?;

    let response = match outcome {
        GenerationOutcome::Accepted(accepted) => {
            let body = GenerateSuccess {
                success: true,
                recipe_id: accepted.recipe_id.to_string(),
                recipe: &accepted.recipe,
                metadata: &accepted.metadata,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        GenerationOutcome::Exhausted(report) => {
            let body = json!({
                "success": false,
                "error": "diversity_exhaustion",
                "message": "couldn't find something different enough; try again or pick another category",
                "report": report,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
        }
    };

    Ok(response)
}

async fn get_preferences_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let prefs = state.store.get_preferences(&user_id).await?;
    Ok(Json(prefs).into_response())
}

async fn update_preferences_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(update): Json<crate::types::PreferencesUpdate>,
) -> Result<Response, ApiError> {
    let prefs = state.store.update_preferences(&user_id, update).await?;
    Ok(Json(prefs).into_response())
}

async fn delete_preferences_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    state.store.delete_preferences(&user_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn diversity_summary_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let summary = state.analytics.get_user_diversity_summary(&user_id).await?;
    Ok(Json(summary).into_response())
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
