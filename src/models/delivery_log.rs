use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Outcome of one send attempt as reported by the orchestrator.
///
/// Only `Sent` counts towards "already sent". Anything else the caller
/// reports (`queued`, `undelivered`, even an empty string) is kept
/// verbatim, lowercased, as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Failed,
    Other(String),
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for DeliveryStatus {
    fn from(s: &str) -> Self {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            _ => Self::Other(normalized),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DeliveryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeliveryStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// One immutable row of the delivery log.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryLogEntry {
    pub id: String,
    pub user_id: String,
    pub phone_number: String,
    /// Trimmed message text.
    pub message_content: String,
    /// SHA-256 hex of `message_content`.
    pub message_hash: String,
    pub status: DeliveryStatus,
    pub twilio_sid: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: i64,
}

/// Input for appending a send attempt. The hash is never supplied by the
/// caller; the store derives it from the trimmed content.
#[derive(Debug, Clone)]
pub struct NewDeliveryLog {
    pub user_id: String,
    pub phone_number: String,
    pub message_content: String,
    pub status: DeliveryStatus,
    pub twilio_sid: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppendOutcome {
    /// A new row was written.
    Logged(DeliveryLogEntry),
    /// A `sent` row for this (user, hash) already existed; nothing was written.
    AlreadyLogged(DeliveryLogEntry),
}

impl AppendOutcome {
    pub fn entry(&self) -> &DeliveryLogEntry {
        match self {
            Self::Logged(e) | Self::AlreadyLogged(e) => e,
        }
    }

    pub fn already_logged(&self) -> bool {
        matches!(self, Self::AlreadyLogged(_))
    }
}

/// Bounds for a recent-history read.
#[derive(Debug, Clone)]
pub struct RecentDeliveries {
    pub limit: i64,
    /// Only entries newer than this many days (None = no age bound).
    pub days_back: Option<i64>,
    /// Status filter (None = every status).
    pub status: Option<DeliveryStatus>,
}

impl RecentDeliveries {
    /// Most recent successful sends, count-bounded only.
    pub fn sent(limit: i64) -> Self {
        Self {
            limit,
            days_back: None,
            status: Some(DeliveryStatus::Sent),
        }
    }
}
