use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::AppState;
use crate::error::AppError;
use crate::util::bearer_matches;

/// Require `Authorization: Bearer <WEBHOOK_SECRET>` on orchestrator calls.
pub async fn webhook_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !bearer_matches(request.headers(), state.webhook_secret.as_deref()) {
        tracing::warn!("Rejected webhook call to {}: bad credentials", request.uri().path());
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

/// Require `Authorization: Bearer <CRON_SECRET>` on the platform cron entry point.
pub async fn cron_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !bearer_matches(request.headers(), state.cron_secret.as_deref()) {
        tracing::warn!("Rejected cron call to {}: bad credentials", request.uri().path());
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}
