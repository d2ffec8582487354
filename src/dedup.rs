//! Message deduplication: content hashing and per-recipient history checks.
//!
//! The hash is the single identity of a message. Both the history check and
//! the delivery log go through [`hash_content`], so a message checked here
//! and later logged always lands on the same key.

use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::db::queries;
use crate::error::Result;
use crate::models::RecentDeliveries;

/// How many recent sent entries a history check loads for context.
pub const HISTORY_CONTEXT_LIMIT: i64 = 100;

/// Characters stripped from both ends of a message: Unicode white space
/// and line terminators plus the byte order mark U+FEFF, but not NEL
/// (U+0085). Hashes already stored by the web dashboard were computed with
/// this set.
fn is_message_padding(c: char) -> bool {
    c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{0085}')
}

/// Strip leading and trailing padding from a message.
pub fn trim_message(text: &str) -> &str {
    text.trim_matches(is_message_padding)
}

/// SHA-256 of the trimmed text, lowercase hex.
///
/// Leading and trailing padding is ignored; anything inside the text
/// (case, punctuation, inner spaces) changes the hash.
pub fn hash_content(text: &str) -> String {
    hex::encode(Sha256::digest(trim_message(text).as_bytes()))
}

/// A previously sent message, reduced to its identity and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentDigest {
    pub message_hash: String,
    pub sent_at: i64,
}

#[derive(Debug, Clone)]
pub struct MessageHistory {
    /// True iff a `sent` entry exists for this user and hash.
    pub already_sent: bool,
    pub message_hash: String,
    /// Number of sent entries loaded as context (at most `HISTORY_CONTEXT_LIMIT`).
    pub previous_messages_count: usize,
    /// Timestamp of the user's most recent sent entry.
    pub last_message_date: Option<i64>,
    /// Most recent sent entries, newest first.
    pub recent: Vec<SentDigest>,
}

/// Check whether `text` was already delivered to `user_id`.
///
/// Failed attempts never count. Any store failure comes back as
/// `AppError::StoreUnavailable`: the caller cannot tell whether the message
/// is unique and must not send it as if it were.
pub fn check_history(conn: &Connection, user_id: &str, text: &str) -> Result<MessageHistory> {
    let message_hash = hash_content(text);

    let existing = queries::get_sent_delivery(conn, user_id, &message_hash)
        .map_err(|e| e.into_store_unavailable())?;

    let recent: Vec<SentDigest> = queries::query_recent_deliveries(
        conn,
        user_id,
        &RecentDeliveries::sent(HISTORY_CONTEXT_LIMIT),
    )
    .map_err(|e| e.into_store_unavailable())?
    .into_iter()
    .map(|entry| SentDigest {
        message_hash: entry.message_hash,
        sent_at: entry.sent_at,
    })
    .collect();

    Ok(MessageHistory {
        already_sent: existing.is_some(),
        message_hash,
        previous_messages_count: recent.len(),
        last_message_date: recent.first().map(|d| d.sent_at),
        recent,
    })
}
