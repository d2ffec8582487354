//! Endpoints called by the orchestrator during a delivery cycle.

mod active_users;
mod deliveries;
mod log_message;
mod message_history;
mod random_trigger;

pub use active_users::*;
pub use deliveries::*;
pub use log_message::*;
pub use message_history::*;
pub use random_trigger::*;

use serde::{Deserialize, Deserializer};

/// Ids and phone numbers arrive as JSON strings or numbers depending on
/// how the orchestrator scenario mapped them.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Number(serde_json::Number),
}

/// Deserialize an optional string-or-number field. Blank strings count as absent.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value
        .map(|v| match v {
            StringOrNumber::Text(s) => s.trim().to_string(),
            StringOrNumber::Number(n) => n.to_string(),
        })
        .filter(|s| !s.is_empty()))
}

/// Blank strings count as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
