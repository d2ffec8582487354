mod from_row;
pub mod migrations;
pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::orchestrator::OrchestratorClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler and background task.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Secret expected on orchestrator webhook calls (None = reject all).
    pub webhook_secret: Option<String>,
    /// Secret expected on the platform cron entry point (None = reject all).
    pub cron_secret: Option<String>,
    pub orchestrator: OrchestratorClient,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
    });
    Pool::builder().max_size(10).build(manager)
}
