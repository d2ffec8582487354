use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Shared secret the orchestrator presents on every webhook call.
    pub webhook_secret: Option<String>,
    /// Shared secret the platform cron presents on the daily entry point.
    pub cron_secret: Option<String>,
    pub orchestrator_webhook_url: Option<String>,
    pub orchestrator_timeout_secs: u64,
    pub trigger_poll_interval_secs: u64,
    /// Fired/failed trigger rows older than this are purged on startup (0 = never).
    pub trigger_retention_days: i64,
    /// Number of pre-migration backups to keep (-1 = all, 0 = no backups).
    pub migration_backup_count: i32,
    pub dev_mode: bool,
}

/// Read an env var, treating unset and blank values the same.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("MOTDUJOUR_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed_var("PORT", 3000),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "motdujour.db".to_string()),
            webhook_secret: non_empty_var("WEBHOOK_SECRET"),
            cron_secret: non_empty_var("CRON_SECRET"),
            orchestrator_webhook_url: non_empty_var("ORCHESTRATOR_WEBHOOK_URL")
                .or_else(|| non_empty_var("MAKE_WEBHOOK_URL")),
            orchestrator_timeout_secs: parsed_var("ORCHESTRATOR_TIMEOUT_SECS", 10),
            trigger_poll_interval_secs: parsed_var("TRIGGER_POLL_INTERVAL_SECS", 60).max(1),
            trigger_retention_days: parsed_var("TRIGGER_RETENTION_DAYS", 30),
            migration_backup_count: parsed_var("MIGRATION_BACKUP_COUNT", 3),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
