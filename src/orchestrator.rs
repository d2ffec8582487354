//! Outbound notifications to the orchestrator webhook.
//!
//! The orchestrator (a Make.com scenario in production) starts a delivery
//! cycle whenever it receives one of these events. Each notification is a
//! single POST; there is no retry, the caller decides what a failure means.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::models::TriggerType;

/// Source tag sent with platform cron notifications.
pub const CRON_SOURCE: &str = "vercel_cron";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("orchestrator webhook URL not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("orchestrator returned status {0}")]
    Status(u16),
}

/// Sent when a random daily trigger fires.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerNotification {
    /// RFC 3339 instant the trigger was scheduled for.
    pub trigger_time: String,
    pub trigger_type: TriggerType,
}

/// Sent by the platform cron entry point.
#[derive(Debug, Clone, Serialize)]
pub struct DailyCronNotification {
    pub trigger_type: TriggerType,
    pub timestamp: String,
    pub source: &'static str,
}

impl DailyCronNotification {
    pub fn new(timestamp: String) -> Self {
        Self {
            trigger_type: TriggerType::DailyScheduled,
            timestamp,
            source: CRON_SOURCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    http: Client,
    url: Option<String>,
    timeout: Duration,
}

impl OrchestratorClient {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            url,
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// POST `event` as JSON to the orchestrator webhook.
    pub async fn notify<T: Serialize>(&self, event: &T) -> Result<(), NotifyError> {
        let url = self.url.as_deref().ok_or(NotifyError::NotConfigured)?;

        let resp = self
            .http
            .post(url)
            .json(event)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            tracing::debug!("Orchestrator webhook returned {}", resp.status());
            return Err(NotifyError::Status(resp.status().as_u16()));
        }

        tracing::debug!("Orchestrator webhook accepted notification");
        Ok(())
    }
}
