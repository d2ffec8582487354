use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{DeliveryLogEntry, DeliveryStatus, RecentDeliveries};
use crate::util::to_rfc3339;

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 100;
const DEFAULT_DAYS_BACK: i64 = 3;
const MAX_DAYS_BACK: i64 = 3650;

#[derive(Debug, Deserialize)]
pub struct DeliveriesQuery {
    pub limit: Option<i64>,
    pub days_back: Option<i64>,
    /// A delivery status, or `all` for every status. Defaults to `sent`.
    pub status: Option<String>,
}

impl DeliveriesQuery {
    fn into_recent(self) -> Result<RecentDeliveries> {
        let days_back = self.days_back.unwrap_or(DEFAULT_DAYS_BACK);
        if days_back < 0 {
            return Err(AppError::BadRequest("days_back cannot be negative".into()));
        }
        if days_back > MAX_DAYS_BACK {
            return Err(AppError::BadRequest(format!(
                "days_back cannot exceed {}",
                MAX_DAYS_BACK
            )));
        }

        let status = match self.status.as_deref().map(str::trim) {
            None => Some(DeliveryStatus::Sent),
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(DeliveryStatus::from(s)),
        };

        Ok(RecentDeliveries {
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            days_back: Some(days_back),
            status,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DeliveryView {
    pub id: String,
    pub phone_number: String,
    pub message_content: String,
    pub message_hash: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilio_sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub sent_at: String,
}

impl From<DeliveryLogEntry> for DeliveryView {
    fn from(entry: DeliveryLogEntry) -> Self {
        Self {
            id: entry.id,
            phone_number: entry.phone_number,
            message_content: entry.message_content,
            message_hash: entry.message_hash,
            status: entry.status,
            twilio_sid: entry.twilio_sid,
            error_message: entry.error_message,
            sent_at: to_rfc3339(entry.sent_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeliveriesResponse {
    pub success: bool,
    pub user_id: String,
    pub count: usize,
    pub deliveries: Vec<DeliveryView>,
}

/// Recent deliveries for one user, newest first. Lets the message
/// generator avoid themes the user saw in the last few days.
pub async fn list_user_deliveries(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<DeliveriesQuery>,
) -> Result<Json<DeliveriesResponse>> {
    let recent = query.into_recent()?;

    let entries = {
        let conn = state.db.get()?;
        queries::query_recent_deliveries(&conn, &user_id, &recent)?
    };
    let deliveries: Vec<DeliveryView> = entries.into_iter().map(DeliveryView::from).collect();

    Ok(Json(DeliveriesResponse {
        success: true,
        user_id,
        count: deliveries.len(),
        deliveries,
    }))
}
