use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// What started an orchestration cycle. Sent verbatim to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerType {
    /// Random instant inside the daily window.
    RandomDaily,
    /// Fixed platform cron.
    DailyScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerStatus {
    Pending,
    Fired,
    Failed,
}

/// A durable one-shot trigger. Rows outlive process restarts so the
/// poller can still fire them.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTrigger {
    pub id: String,
    pub trigger_type: TriggerType,
    /// Unix seconds.
    pub fire_at: i64,
    pub status: TriggerStatus,
    pub created_at: i64,
    pub fired_at: Option<i64>,
    pub error_message: Option<String>,
}
