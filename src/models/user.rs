use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Account holder. Phone fields stay optional until the user fills them in
/// from the dashboard; only users with both set receive messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    /// Local number as typed by the user, e.g. "0612345678".
    pub phone_number: Option<String>,
    /// Dial code without '+', e.g. "33".
    pub phone_country: Option<String>,
    /// Free-form plan role: "owner", "member", "personal", "gift", "family", ...
    pub role: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub phone_country: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "owner".to_string()
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            return Err(AppError::BadRequest("Invalid email format".into()));
        }
        if self.role.trim().is_empty() {
            return Err(AppError::BadRequest("Role cannot be empty".into()));
        }
        Ok(())
    }
}

/// Billing team. Family plans share one team across several users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub plan_name: Option<String>,
    pub subscription_status: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub plan_name: Option<String>,
    pub subscription_status: Option<String>,
}

/// Raw eligible-user row, before phone formatting.
#[derive(Debug, Clone)]
pub struct ActiveUser {
    pub id: String,
    pub email: String,
    pub phone_number: String,
    pub phone_country: String,
    pub role: String,
    pub plan_name: Option<String>,
    pub subscription_status: Option<String>,
}

/// A user eligible for today's send, in the shape the orchestrator consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user_id: String,
    pub email: String,
    /// Dial code + local number with one leading zero removed.
    pub phone_number: String,
    pub role: String,
    pub plan_name: Option<String>,
    pub subscription_status: Option<String>,
}
