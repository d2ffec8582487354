use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::orchestrator::DailyCronNotification;
use crate::util::now_rfc3339;

#[derive(Debug, Serialize)]
pub struct CronTriggerResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
}

/// Platform cron entry point: start a delivery cycle right now.
pub async fn daily_trigger(State(state): State<AppState>) -> Result<Json<CronTriggerResponse>> {
    if !state.orchestrator.is_configured() {
        return Err(AppError::Internal(
            "Orchestrator webhook URL not configured".into(),
        ));
    }

    state
        .orchestrator
        .notify(&DailyCronNotification::new(now_rfc3339()))
        .await?;

    let timestamp = now_rfc3339();
    tracing::info!("Triggered orchestrator webhook at {}", timestamp);

    Ok(Json(CronTriggerResponse {
        success: true,
        message: "Daily webhook triggered successfully",
        timestamp,
    }))
}
