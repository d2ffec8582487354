use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Users (account holders; phone fields filled in from the dashboard)
        -- Soft delete: deleted_at = timestamp when deleted, NULL = active
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            phone_number TEXT,
            phone_country TEXT,
            role TEXT NOT NULL DEFAULT 'owner',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_users_reachable ON users(created_at)
            WHERE phone_number IS NOT NULL AND phone_country IS NOT NULL AND deleted_at IS NULL;

        -- Teams (billing unit; plan and subscription live here)
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            plan_name TEXT,
            subscription_status TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS team_members (
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            role TEXT NOT NULL DEFAULT 'member',
            joined_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, team_id)
        );
        CREATE INDEX IF NOT EXISTS idx_team_members_team ON team_members(team_id);

        -- Delivery log (append-only; one row per send attempt)
        -- user_id is not a foreign key: the orchestrator may log for ids
        -- it got from an older user snapshot.
        CREATE TABLE IF NOT EXISTS delivery_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            message_content TEXT NOT NULL,
            message_hash TEXT NOT NULL,
            status TEXT NOT NULL,
            twilio_sid TEXT,
            error_message TEXT,
            sent_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_delivery_logs_user_sent_at ON delivery_logs(user_id, sent_at);
        -- At most one successful send per (user, content): the insert itself
        -- detects duplicates, so concurrent writers cannot both log a send.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_delivery_logs_sent_once
            ON delivery_logs(user_id, message_hash) WHERE status = 'sent';

        CREATE TRIGGER IF NOT EXISTS delivery_logs_no_update
        BEFORE UPDATE ON delivery_logs
        BEGIN
            SELECT RAISE(ABORT, 'delivery_logs is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS delivery_logs_no_delete
        BEFORE DELETE ON delivery_logs
        BEGIN
            SELECT RAISE(ABORT, 'delivery_logs is append-only');
        END;

        -- Scheduled triggers (durable one-shot orchestrator notifications)
        CREATE TABLE IF NOT EXISTS scheduled_triggers (
            id TEXT PRIMARY KEY,
            trigger_type TEXT NOT NULL CHECK (trigger_type IN ('random_daily', 'daily_scheduled')),
            fire_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'fired', 'failed')),
            created_at INTEGER NOT NULL,
            fired_at INTEGER,
            error_message TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_scheduled_triggers_due ON scheduled_triggers(fire_at)
            WHERE status = 'pending';
        "#,
    )
}
