pub mod cron;
pub mod webhooks;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;
use crate::error::AppError;
use crate::extractors::Json;
use crate::middleware::{cron_auth, webhook_auth};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Wrong method on a known path. Runs before authentication.
async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn not_found() -> AppError {
    AppError::NotFound("No such endpoint".into())
}

pub fn router(state: AppState) -> Router<AppState> {
    let webhook = || middleware::from_fn_with_state(state.clone(), webhook_auth);
    let cron = middleware::from_fn_with_state(state.clone(), cron_auth);

    Router::new()
        .route("/health", get(health))
        // Orchestrator webhooks (WEBHOOK_SECRET)
        .route(
            "/api/webhooks/get-active-users",
            post(webhooks::get_active_users)
                .route_layer(webhook())
                .fallback(method_not_allowed),
        )
        .route(
            "/api/webhooks/check-message-history",
            post(webhooks::check_message_history)
                .route_layer(webhook())
                .fallback(method_not_allowed),
        )
        .route(
            "/api/webhooks/log-sent-message",
            post(webhooks::log_sent_message)
                .route_layer(webhook())
                .fallback(method_not_allowed),
        )
        .route(
            "/api/webhooks/random-daily-trigger",
            post(webhooks::random_daily_trigger)
                .route_layer(webhook())
                .fallback(method_not_allowed),
        )
        .route(
            "/api/webhooks/users/{user_id}/deliveries",
            get(webhooks::list_user_deliveries)
                .route_layer(webhook())
                .fallback(method_not_allowed),
        )
        // Platform cron (CRON_SECRET)
        .route(
            "/api/cron/daily-trigger",
            get(cron::daily_trigger)
                .route_layer(cron)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
}
