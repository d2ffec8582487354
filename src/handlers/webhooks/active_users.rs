use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::Json;
use crate::models::Recipient;
use crate::recipients;

#[derive(Debug, Serialize)]
pub struct ActiveUsersResponse {
    pub success: bool,
    pub count: usize,
    pub users: Vec<Recipient>,
}

/// List every user who should receive today's message.
pub async fn get_active_users(State(state): State<AppState>) -> Result<Json<ActiveUsersResponse>> {
    let conn = state.db.get()?;
    let users = recipients::list_active(&conn)?;

    tracing::info!("Found {} active users with phone numbers", users.len());

    Ok(Json(ActiveUsersResponse {
        success: true,
        count: users.len(),
        users,
    }))
}
