//! Shared helpers for request handling and timestamps.

use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use subtle::ConstantTimeEq;

/// Check the `Authorization` header against `Bearer <secret>`.
///
/// The whole header value must match exactly; no trimming, no case folding.
/// An unconfigured (`None`) secret never matches.
pub fn bearer_matches(headers: &HeaderMap, secret: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return false;
    };
    let Some(header) = headers.get("Authorization").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let expected = format!("Bearer {}", secret);
    header.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Current time as RFC 3339 UTC with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format a unix timestamp (seconds) as RFC 3339 UTC with millisecond precision.
pub fn to_rfc3339(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| timestamp.to_string())
}
