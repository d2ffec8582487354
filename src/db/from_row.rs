//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors
/// instead of panicking on unexpected stored values.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const DELIVERY_LOG_COLS: &str = "id, user_id, phone_number, message_content, message_hash, status, twilio_sid, error_message, sent_at";

pub const SCHEDULED_TRIGGER_COLS: &str =
    "id, trigger_type, fire_at, status, created_at, fired_at, error_message";

// ============ FromRow Implementations ============

/// Columns: id, email, phone_number, phone_country, role, plan_name, subscription_status
impl FromRow for ActiveUser {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ActiveUser {
            id: row.get(0)?,
            email: row.get(1)?,
            phone_number: row.get(2)?,
            phone_country: row.get(3)?,
            role: row.get(4)?,
            plan_name: row.get(5)?,
            subscription_status: row.get(6)?,
        })
    }
}

impl FromRow for DeliveryLogEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DeliveryLogEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            phone_number: row.get(2)?,
            message_content: row.get(3)?,
            message_hash: row.get(4)?,
            status: parse_enum(row, 5, "status")?,
            twilio_sid: row.get(6)?,
            error_message: row.get(7)?,
            sent_at: row.get(8)?,
        })
    }
}

impl FromRow for ScheduledTrigger {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ScheduledTrigger {
            id: row.get(0)?,
            trigger_type: parse_enum(row, 1, "trigger_type")?,
            fire_at: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            created_at: row.get(4)?,
            fired_at: row.get(5)?,
            error_message: row.get(6)?,
        })
    }
}
