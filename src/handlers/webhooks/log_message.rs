use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{DeliveryStatus, NewDeliveryLog};
use crate::util::to_rfc3339;

use super::{non_blank, string_or_number};

#[derive(Debug, Deserialize)]
pub struct LogMessageRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub message_content: Option<String>,
    /// Defaults to `sent` when absent; any other value is stored as given.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub twilio_sid: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogMessageResponse {
    pub success: bool,
    pub log_id: String,
    pub message_hash: String,
    pub status: DeliveryStatus,
    pub sent_at: String,
    /// True when an identical successful send was already on record and
    /// no new entry was written.
    pub already_logged: bool,
}

/// Record the outcome of one send attempt.
pub async fn log_sent_message(
    State(state): State<AppState>,
    Json(req): Json<LogMessageRequest>,
) -> Result<Json<LogMessageResponse>> {
    let (Some(user_id), Some(phone_number), Some(message_content)) =
        (req.user_id, req.phone_number, non_blank(req.message_content))
    else {
        return Err(AppError::BadRequest(
            "Missing required fields: user_id, phone_number, message_content".into(),
        ));
    };

    let status = req
        .status
        .as_deref()
        .map(DeliveryStatus::from)
        .unwrap_or_default();

    let input = NewDeliveryLog {
        user_id,
        phone_number,
        message_content,
        status,
        twilio_sid: non_blank(req.twilio_sid),
        error_message: non_blank(req.error_message),
    };

    let outcome = {
        let conn = state.db.get()?;
        queries::append_delivery_log(&conn, &input)?
    };
    let entry = outcome.entry();

    if outcome.already_logged() {
        tracing::info!(
            "Message {} already logged as sent for user {}, keeping {}",
            entry.message_hash,
            entry.user_id,
            entry.id
        );
    } else {
        tracing::info!("Message logged for user {}: {}", entry.user_id, entry.status);
    }

    Ok(Json(LogMessageResponse {
        success: true,
        log_id: entry.id.clone(),
        message_hash: entry.message_hash.clone(),
        status: entry.status.clone(),
        sent_at: to_rfc3339(entry.sent_at),
        already_logged: outcome.already_logged(),
    }))
}
