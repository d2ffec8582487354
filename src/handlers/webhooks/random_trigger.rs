use axum::extract::State;
use chrono::Local;
use serde::Serialize;

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::scheduler;
use crate::util::to_rfc3339;

#[derive(Debug, Serialize)]
pub struct RandomTriggerResponse {
    pub success: bool,
    pub scheduled_time: String,
    pub delay_ms: i64,
    pub delay_hours: f64,
    pub trigger_id: String,
}

/// Arm today's (or tomorrow's) random trigger and return immediately.
/// The orchestrator is notified later; that outcome never reaches this caller.
pub async fn random_daily_trigger(
    State(state): State<AppState>,
) -> Result<Json<RandomTriggerResponse>> {
    if !state.orchestrator.is_configured() {
        return Err(AppError::Internal(
            "Orchestrator webhook URL not configured".into(),
        ));
    }

    let offset = scheduler::random_offset_minutes(&mut rand::thread_rng());
    let plan = scheduler::plan_trigger(&Local::now(), offset);
    let trigger = scheduler::arm_random_trigger(&state, &plan)?;

    Ok(Json(RandomTriggerResponse {
        success: true,
        scheduled_time: to_rfc3339(trigger.fire_at),
        delay_ms: plan.delay_ms(),
        delay_hours: plan.delay_hours(),
        trigger_id: trigger.id,
    }))
}
