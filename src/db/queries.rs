use chrono::Utc;
use rusqlite::{Connection, ToSql, params};

use crate::dedup::{hash_content, trim_message};
use crate::error::{AppError, Result};
use crate::id::EntityType;
use crate::models::*;

use super::from_row::{DELIVERY_LOG_COLS, SCHEDULED_TRIGGER_COLS, query_all, query_one};

fn now() -> i64 {
    Utc::now().timestamp()
}

const SECONDS_PER_DAY: i64 = 86_400;

/// Unix time `days` days ago, saturating for out-of-range inputs.
fn days_ago(days: i64) -> i64 {
    now().saturating_sub(days.saturating_mul(SECONDS_PER_DAY))
}

// ============ Users ============

/// Create a user. Empty phone fields are stored as NULL.
pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    input.validate()?;

    let id = EntityType::User.gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();
    let phone_number = non_blank(input.phone_number.as_deref());
    let phone_country = non_blank(input.phone_country.as_deref());
    let role = input.role.trim().to_string();

    conn.execute(
        "INSERT INTO users (id, email, name, phone_number, phone_country, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![&id, &email, &input.name, &phone_number, &phone_country, &role, now, now],
    )?;

    Ok(User {
        id,
        email,
        name: input.name.clone(),
        phone_number,
        phone_country,
        role,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Count users that are not soft-deleted.
pub fn count_users(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============ Teams ============

pub fn create_team(conn: &Connection, input: &CreateTeam) -> Result<Team> {
    let id = EntityType::Team.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO teams (id, name, plan_name, subscription_status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &id,
            &input.name,
            &input.plan_name,
            &input.subscription_status,
            now,
            now
        ],
    )?;

    Ok(Team {
        id,
        name: input.name.clone(),
        plan_name: input.plan_name.clone(),
        subscription_status: input.subscription_status.clone(),
        created_at: now,
        updated_at: now,
    })
}

pub fn add_team_member(conn: &Connection, team_id: &str, user_id: &str, role: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO team_members (user_id, team_id, role, joined_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, team_id, role, now()],
    )?;
    Ok(())
}

// ============ Recipients ============

/// Users who can receive today's message: both phone fields set and not
/// soft-deleted. Plan data comes from the first team the user joined.
pub fn list_active_users(conn: &Connection) -> Result<Vec<ActiveUser>> {
    query_all(
        conn,
        "SELECT u.id, u.email, u.phone_number, u.phone_country, u.role,
                t.plan_name, t.subscription_status
         FROM users u
         LEFT JOIN teams t ON t.id = (
             SELECT tm.team_id FROM team_members tm
             WHERE tm.user_id = u.id
             ORDER BY tm.joined_at, tm.rowid
             LIMIT 1
         )
         WHERE u.phone_number IS NOT NULL AND u.phone_number != ''
           AND u.phone_country IS NOT NULL AND u.phone_country != ''
           AND u.deleted_at IS NULL
         ORDER BY u.created_at, u.rowid",
        &[],
    )
}

// ============ Delivery Log ============

/// Append one send attempt to the delivery log.
///
/// A `sent` row for a (user, content) pair that is already logged as sent
/// is not written twice; the existing row comes back as `AlreadyLogged`.
pub fn append_delivery_log(conn: &Connection, input: &NewDeliveryLog) -> Result<AppendOutcome> {
    let user_id = input.user_id.trim();
    let phone_number = input.phone_number.trim();
    let content = trim_message(&input.message_content);

    let mut missing = Vec::new();
    if user_id.is_empty() {
        missing.push("user_id");
    }
    if phone_number.is_empty() {
        missing.push("phone_number");
    }
    if content.is_empty() {
        missing.push("message_content");
    }
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let entry = DeliveryLogEntry {
        id: EntityType::DeliveryLog.gen_id(),
        user_id: user_id.to_string(),
        phone_number: phone_number.to_string(),
        message_content: content.to_string(),
        message_hash: hash_content(content),
        status: input.status.clone(),
        twilio_sid: input.twilio_sid.clone(),
        error_message: input.error_message.clone(),
        sent_at: now(),
    };

    // The partial unique index on (user_id, message_hash) WHERE status = 'sent'
    // is the only conflict target a fresh id can hit.
    let inserted = conn.execute(
        "INSERT INTO delivery_logs (id, user_id, phone_number, message_content, message_hash, status, twilio_sid, error_message, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT DO NOTHING",
        params![
            &entry.id,
            &entry.user_id,
            &entry.phone_number,
            &entry.message_content,
            &entry.message_hash,
            entry.status.as_str(),
            &entry.twilio_sid,
            &entry.error_message,
            entry.sent_at,
        ],
    )?;

    if inserted > 0 {
        return Ok(AppendOutcome::Logged(entry));
    }

    match get_sent_delivery(conn, &entry.user_id, &entry.message_hash)? {
        Some(existing) => Ok(AppendOutcome::AlreadyLogged(existing)),
        None => Err(AppError::Internal(format!(
            "delivery log insert for user {} was dropped without a matching sent entry",
            entry.user_id
        ))),
    }
}

/// The successful send of `message_hash` to `user_id`, if any.
pub fn get_sent_delivery(
    conn: &Connection,
    user_id: &str,
    message_hash: &str,
) -> Result<Option<DeliveryLogEntry>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM delivery_logs
             WHERE user_id = ?1 AND message_hash = ?2 AND status = 'sent'
             LIMIT 1",
            DELIVERY_LOG_COLS
        ),
        &[&user_id, &message_hash],
    )
}

/// Most recent entries for one user, newest first. Entries logged in the
/// same second keep insertion order (latest first).
pub fn query_recent_deliveries(
    conn: &Connection,
    user_id: &str,
    query: &RecentDeliveries,
) -> Result<Vec<DeliveryLogEntry>> {
    let mut where_clause = String::from("WHERE user_id = ?");
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(ref status) = query.status {
        where_clause.push_str(" AND status = ?");
        params.push(Box::new(status.as_str().to_string()));
    }
    if let Some(days) = query.days_back {
        where_clause.push_str(" AND sent_at >= ?");
        params.push(Box::new(days_ago(days.max(0))));
    }
    params.push(Box::new(query.limit.max(0)));

    let sql = format!(
        "SELECT {} FROM delivery_logs {} ORDER BY sent_at DESC, rowid DESC LIMIT ?",
        DELIVERY_LOG_COLS, where_clause
    );
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    query_all(conn, &sql, &param_refs)
}

// ============ Scheduled Triggers ============

pub fn create_scheduled_trigger(
    conn: &Connection,
    trigger_type: TriggerType,
    fire_at: i64,
) -> Result<ScheduledTrigger> {
    let id = EntityType::ScheduledTrigger.gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO scheduled_triggers (id, trigger_type, fire_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &id,
            trigger_type.as_ref(),
            fire_at,
            TriggerStatus::Pending.as_ref(),
            now
        ],
    )?;

    Ok(ScheduledTrigger {
        id,
        trigger_type,
        fire_at,
        status: TriggerStatus::Pending,
        created_at: now,
        fired_at: None,
        error_message: None,
    })
}

pub fn get_scheduled_trigger(conn: &Connection, id: &str) -> Result<Option<ScheduledTrigger>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM scheduled_triggers WHERE id = ?1",
            SCHEDULED_TRIGGER_COLS
        ),
        &[&id],
    )
}

/// Atomically move a pending trigger to `fired`. Returns false when another
/// task already claimed it.
pub fn try_claim_trigger(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE scheduled_triggers SET status = 'fired', fired_at = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![now(), id],
    )?;
    Ok(affected > 0)
}

/// Record a failed notification on a claimed trigger.
pub fn mark_trigger_failed(conn: &Connection, id: &str, error: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE scheduled_triggers SET status = 'failed', error_message = ?1
         WHERE id = ?2 AND status = 'fired'",
        params![error, id],
    )?;
    Ok(affected > 0)
}

/// Give up on a pending trigger without firing it.
pub fn expire_trigger(conn: &Connection, id: &str, reason: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE scheduled_triggers SET status = 'failed', error_message = ?1
         WHERE id = ?2 AND status = 'pending'",
        params![reason, id],
    )?;
    Ok(affected > 0)
}

/// Pending triggers whose fire time has passed, oldest first.
pub fn list_due_triggers(conn: &Connection, now: i64) -> Result<Vec<ScheduledTrigger>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM scheduled_triggers
             WHERE status = 'pending' AND fire_at <= ?1
             ORDER BY fire_at",
            SCHEDULED_TRIGGER_COLS
        ),
        &[&now],
    )
}

/// Delete settled triggers created more than `retention_days` ago.
/// Pending rows are never purged.
pub fn purge_old_triggers(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = days_ago(retention_days);
    let deleted = conn.execute(
        "DELETE FROM scheduled_triggers WHERE status != 'pending' AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
