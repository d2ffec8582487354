//! Test utilities and fixtures for Mot du jour integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    routing::post,
};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

// Re-export the main library crate
pub use motdujour::db::{AppState, init_db, queries};
pub use motdujour::handlers;
pub use motdujour::models::*;
pub use motdujour::orchestrator::OrchestratorClient;

pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const TEST_CRON_SECRET: &str = "test-cron-secret";

pub const ONE_DAY: i64 = 86_400;

/// Nothing listens on the discard port, so requests fail fast.
pub const UNREACHABLE_ORCHESTRATOR_URL: &str = "http://127.0.0.1:9/hook";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("Failed to enable foreign keys");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create a user. `phone` is (dial code, local number).
pub fn create_test_user(conn: &Connection, email: &str, phone: Option<(&str, &str)>) -> User {
    let input = CreateUser {
        email: email.to_string(),
        name: None,
        phone_number: phone.map(|(_, local)| local.to_string()),
        phone_country: phone.map(|(code, _)| code.to_string()),
        role: "owner".to_string(),
    };
    queries::create_user(conn, &input).expect("Failed to create test user")
}

/// Create a user reachable on a French mobile number.
pub fn create_reachable_user(conn: &Connection, email: &str) -> User {
    create_test_user(conn, email, Some(("33", "0612345678")))
}

/// Load a user that is not soft-deleted.
pub fn find_active_user(conn: &Connection, id: &str) -> Option<User> {
    conn.query_row(
        "SELECT id, email, name, phone_number, phone_country, role, created_at, updated_at, deleted_at
         FROM users WHERE id = ?1 AND deleted_at IS NULL",
        [id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                phone_number: row.get(3)?,
                phone_country: row.get(4)?,
                role: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
                deleted_at: row.get(8)?,
            })
        },
    )
    .optional()
    .expect("Failed to load user")
}

/// Soft delete a user the way the dashboard does. Returns false when the
/// user was already deleted.
pub fn soft_delete_user(conn: &Connection, id: &str) -> bool {
    let now = chrono::Utc::now().timestamp();
    let affected = conn
        .execute(
            "UPDATE users SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            rusqlite::params![now, id],
        )
        .expect("Failed to soft delete user");
    affected > 0
}

/// (plan_name, subscription_status) stored for a team.
pub fn team_plan(conn: &Connection, team_id: &str) -> (Option<String>, Option<String>) {
    conn.query_row(
        "SELECT plan_name, subscription_status FROM teams WHERE id = ?1",
        [team_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .expect("Failed to load team")
}

pub fn create_test_team(conn: &Connection, plan_name: &str, status: &str) -> Team {
    let input = CreateTeam {
        name: format!("Team {}", plan_name),
        plan_name: Some(plan_name.to_string()),
        subscription_status: Some(status.to_string()),
    };
    queries::create_team(conn, &input).expect("Failed to create test team")
}

/// Append a delivery log entry with the given status.
pub fn log_delivery(
    conn: &Connection,
    user_id: &str,
    content: &str,
    status: DeliveryStatus,
) -> AppendOutcome {
    let input = NewDeliveryLog {
        user_id: user_id.to_string(),
        phone_number: "33612345678".to_string(),
        message_content: content.to_string(),
        status,
        twilio_sid: None,
        error_message: None,
    };
    queries::append_delivery_log(conn, &input).expect("Failed to append delivery log")
}

/// Insert a delivery row with an explicit timestamp, bypassing the store API.
pub fn insert_delivery_at(conn: &Connection, id: &str, user_id: &str, content: &str, sent_at: i64) {
    conn.execute(
        "INSERT INTO delivery_logs (id, user_id, phone_number, message_content, message_hash, status, sent_at)
         VALUES (?1, ?2, '33612345678', ?3, ?4, 'sent', ?5)",
        rusqlite::params![id, user_id, content, motdujour::dedup::hash_content(content), sent_at],
    )
    .expect("Failed to insert delivery row");
}

/// Build app state over a single-connection in-memory pool.
///
/// Every pooled connection to `:memory:` is its own database, so the pool
/// holds exactly one. Tests must drop their connection before calling into
/// the app.
pub fn create_test_app_state(orchestrator_url: Option<String>) -> AppState {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(1)
        .connection_timeout(Duration::from_secs(5))
        .build(manager)
        .unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        cron_secret: Some(TEST_CRON_SECRET.to_string()),
        orchestrator: OrchestratorClient::new(orchestrator_url, Duration::from_secs(2)),
    }
}

pub fn test_app(state: AppState) -> Router {
    handlers::router(state.clone()).with_state(state)
}

/// Request carrying the webhook bearer secret, with an optional JSON body.
pub fn webhook_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    authed_request(method, uri, TEST_WEBHOOK_SECRET, body)
}

pub fn authed_request(method: &str, uri: &str, secret: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", secret));
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("response body should be JSON")
}

/// A local stand-in for the orchestrator webhook that records every
/// JSON body it receives and answers with a fixed status.
pub struct OrchestratorStub {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
}

impl OrchestratorStub {
    pub async fn spawn(status: StatusCode) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let app = Router::new().route(
            "/hook",
            post(move |axum::Json(body): axum::Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/hook", addr),
            received,
        }
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    /// Wait until at least `count` notifications arrived (or give up after ~3s).
    pub async fn wait_for(&self, count: usize) -> Vec<Value> {
        for _ in 0..60 {
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.received()
    }
}
