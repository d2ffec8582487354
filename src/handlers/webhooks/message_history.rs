use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::dedup;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::util::to_rfc3339;

use super::{non_blank, string_or_number};

#[derive(Debug, Deserialize)]
pub struct CheckHistoryRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckHistoryResponse {
    pub success: bool,
    /// True when this exact text was already delivered to the user.
    pub message_exists: bool,
    pub message_hash: String,
    pub user_id: String,
    pub previous_messages_count: usize,
    pub last_message_date: Option<String>,
}

/// Check a candidate message against the user's delivery history.
pub async fn check_message_history(
    State(state): State<AppState>,
    Json(req): Json<CheckHistoryRequest>,
) -> Result<Json<CheckHistoryResponse>> {
    let (Some(user_id), Some(content)) = (req.user_id, non_blank(req.message_content)) else {
        return Err(AppError::BadRequest(
            "Missing required fields: user_id, message_content".into(),
        ));
    };

    let history = {
        let conn = state
            .db
            .get()
            .map_err(|e| AppError::from(e).into_store_unavailable())?;
        dedup::check_history(&conn, &user_id, &content)?
    };

    if history.already_sent {
        tracing::info!("Message {} already sent to user {}", history.message_hash, user_id);
    }

    Ok(Json(CheckHistoryResponse {
        success: true,
        message_exists: history.already_sent,
        message_hash: history.message_hash,
        user_id,
        previous_messages_count: history.previous_messages_count,
        last_message_date: history.last_message_date.map(to_rfc3339),
    }))
}
