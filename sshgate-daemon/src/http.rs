//! JSON HTTP surface for the authentication flows.
//!
//! Thin layer over [`Authenticator`]: every authentication failure maps
//! to the same generic 401 body and every internal fault to a generic
//! 500, with detail kept in server-side logs only.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::service::{AuthError, Authenticator};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
}

/// Build the API router.
pub fn router(auth: Arc<Authenticator>) -> Router {
    Router::new()
        .route("/auth/challenge", post(issue_challenge))
        .route("/auth/response", post(complete_challenge))
        .route(
            "/auth/session/:token",
            get(show_session).delete(end_session),
        )
        .with_state(AppState { auth })
}

#[derive(Debug, Deserialize)]
struct ChallengeRequest {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ResponseRequest {
    user_id: String,
    ssh_auth_response: String,
}

#[derive(Debug, Serialize)]
struct SessionInfo {
    user_id: String,
    established_at: i64,
}

async fn issue_challenge(
    State(state): State<AppState>,
    Json(request): Json<ChallengeRequest>,
) -> Result<Response, ApiError> {
    let payload = state.auth.begin(&request.user_id).await?;
    Ok(Json(payload).into_response())
}

async fn complete_challenge(
    State(state): State<AppState>,
    Json(request): Json<ResponseRequest>,
) -> Result<Response, ApiError> {
    let grant = state
        .auth
        .complete(&request.user_id, &request.ssh_auth_response)
        .await?;
    Ok(Json(grant).into_response())
}

async fn show_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let session = state
        .auth
        .session(&token)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(SessionInfo {
        user_id: session.user_id,
        established_at: session.established_at,
    })
    .into_response())
}

async fn end_session(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    state.auth.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// API failure categories. Bodies stay generic in both cases so clients
/// cannot distinguish which step failed.
enum ApiError {
    Unauthorized,
    Internal,
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        if error.is_client_fault() {
            tracing::debug!(error = %error, "authentication rejected");
            Self::Unauthorized
        } else {
            tracing::error!(error = %error, "internal authentication fault");
            Self::Internal
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "authentication failed"),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
