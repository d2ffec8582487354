//! Orchestrator webhook flow: recipients, history checks, delivery logging, random trigger

#[path = "../common/mod.rs"]
mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use common::*;
use motdujour::dedup::hash_content;

async fn check(state: &AppState, user_id: serde_json::Value, content: &str) -> serde_json::Value {
    let response = test_app(state.clone())
        .oneshot(webhook_request(
            "POST",
            "/api/webhooks/check-message-history",
            Some(json!({ "user_id": user_id, "message_content": content })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn log(state: &AppState, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = test_app(state.clone())
        .oneshot(webhook_request("POST", "/api/webhooks/log-sent-message", Some(body)))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

// ============ get-active-users ============

#[tokio::test]
async fn test_get_active_users_lists_eligible_recipients() {
    let state = create_test_app_state(None);
    let (member, team) = {
        let conn = state.db.get().unwrap();
        let team = create_test_team(&conn, "Family", "active");
        let member = create_reachable_user(&conn, "marie@example.fr");
        queries::add_team_member(&conn, &team.id, &member.id, "family").unwrap();
        create_test_user(&conn, "nophone@example.fr", None);
        (member, team)
    };

    let response = test_app(state)
        .oneshot(webhook_request("POST", "/api/webhooks/get-active-users", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1, "user without phone should be excluded");

    let user = &body["users"][0];
    assert_eq!(user["user_id"], member.id.as_str());
    assert_eq!(user["email"], "marie@example.fr");
    assert_eq!(user["phone_number"], "33612345678");
    assert_eq!(user["role"], "owner");
    assert_eq!(user["plan_name"], team.plan_name.unwrap().as_str());
    assert_eq!(user["subscription_status"], "active");
}

#[tokio::test]
async fn test_get_active_users_empty() {
    let state = create_test_app_state(None);

    let response = test_app(state)
        .oneshot(webhook_request("POST", "/api/webhooks/get-active-users", None))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["users"], json!([]));
}

// ============ check-message-history ============

#[tokio::test]
async fn test_check_new_message() {
    let state = create_test_app_state(None);

    let body = check(&state, json!("user-1"), "Bonjour!").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["message_exists"], false);
    assert_eq!(body["message_hash"], hash_content("Bonjour!").as_str());
    assert_eq!(body["user_id"], "user-1");
    assert_eq!(body["previous_messages_count"], 0);
    assert!(body["last_message_date"].is_null());
}

#[tokio::test]
async fn test_check_accepts_numeric_user_id() {
    let state = create_test_app_state(None);

    let body = check(&state, json!(42), "Bonjour!").await;

    assert_eq!(body["user_id"], "42", "numeric ids should be stringified");
}

#[tokio::test]
async fn test_check_missing_fields() {
    let state = create_test_app_state(None);

    let response = test_app(state)
        .oneshot(webhook_request(
            "POST",
            "/api/webhooks/check-message-history",
            Some(json!({ "user_id": "user-1", "message_content": "   " })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["details"],
        "Missing required fields: user_id, message_content"
    );
}

#[tokio::test]
async fn test_bonjour_flow_over_http() {
    let state = create_test_app_state(None);

    let (status, logged) = log(
        &state,
        json!({
            "user_id": "user-1",
            "phone_number": "33612345678",
            "message_content": "Bonjour!",
            "twilio_sid": "SM123"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged["status"], "sent", "status should default to sent");
    assert_eq!(logged["already_logged"], false);
    assert!(logged["log_id"].as_str().unwrap().starts_with("mdj_log_"));

    let same = check(&state, json!("user-1"), "  Bonjour!  ").await;
    assert_eq!(same["message_exists"], true);
    assert_eq!(same["previous_messages_count"], 1);
    assert_eq!(same["last_message_date"], logged["sent_at"]);

    let different = check(&state, json!("user-1"), "Bonjour!!").await;
    assert_eq!(different["message_exists"], false);

    let other_user = check(&state, json!("user-2"), "Bonjour!").await;
    assert_eq!(other_user["message_exists"], false, "history is per recipient");
}

// ============ log-sent-message ============

#[tokio::test]
async fn test_failed_log_does_not_mark_message_sent() {
    let state = create_test_app_state(None);

    let (status, logged) = log(
        &state,
        json!({
            "user_id": "user-1",
            "phone_number": "33612345678",
            "message_content": "Bonjour!",
            "status": "failed",
            "error_message": "carrier rejected"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logged["status"], "failed");

    let body = check(&state, json!("user-1"), "Bonjour!").await;
    assert_eq!(body["message_exists"], false);
}

#[tokio::test]
async fn test_repeated_sent_log_is_idempotent() {
    let state = create_test_app_state(None);
    let payload = json!({
        "user_id": 7,
        "phone_number": 33612345678u64,
        "message_content": "Bonjour!"
    });

    let (_, first) = log(&state, payload.clone()).await;
    let (status, second) = log(&state, payload).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_logged"], true);
    assert_eq!(second["log_id"], first["log_id"], "original entry should be returned");
    assert_eq!(second["sent_at"], first["sent_at"]);
}

#[tokio::test]
async fn test_log_missing_fields() {
    let state = create_test_app_state(None);

    let (status, body) = log(&state, json!({ "user_id": "user-1", "message_content": "Bonjour!" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        "Missing required fields: user_id, phone_number, message_content"
    );
}

#[tokio::test]
async fn test_log_keeps_blank_status_verbatim() {
    let state = create_test_app_state(None);

    let (status, body) = log(
        &state,
        json!({
            "user_id": "user-1",
            "phone_number": "33612345678",
            "message_content": "Bonjour!",
            "status": "  "
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "");
    assert_eq!(body["already_logged"], false);

    // A blank status is not a successful send
    let history = check(&state, json!("user-1"), "Bonjour!").await;
    assert_eq!(history["message_exists"], false);
}

// ============ random-daily-trigger ============

#[tokio::test]
async fn test_random_trigger_requires_orchestrator_url() {
    let state = create_test_app_state(None);

    let response = test_app(state)
        .oneshot(webhook_request("POST", "/api/webhooks/random-daily-trigger", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Orchestrator webhook URL not configured");
}

#[tokio::test]
async fn test_random_trigger_arms_a_pending_trigger() {
    let stub = OrchestratorStub::spawn(StatusCode::OK).await;
    let state = create_test_app_state(Some(stub.url.clone()));

    let response = test_app(state.clone())
        .oneshot(webhook_request("POST", "/api/webhooks/random-daily-trigger", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let delay_ms = body["delay_ms"].as_i64().unwrap();
    assert!(delay_ms > 0, "delay should be positive");
    assert!(delay_ms <= 24 * 60 * 60 * 1000, "trigger should be within a day");

    let delay_hours = body["delay_hours"].as_f64().unwrap();
    assert!((delay_hours - delay_ms as f64 / 3_600_000.0).abs() <= 0.005);

    let scheduled = chrono::DateTime::parse_from_rfc3339(body["scheduled_time"].as_str().unwrap())
        .expect("scheduled_time should be RFC 3339");

    let trigger_id = body["trigger_id"].as_str().unwrap();
    let conn = state.db.get().unwrap();
    let trigger = queries::get_scheduled_trigger(&conn, trigger_id)
        .unwrap()
        .expect("trigger row should exist");
    assert_eq!(trigger.status, TriggerStatus::Pending);
    assert_eq!(trigger.trigger_type, TriggerType::RandomDaily);
    assert_eq!(trigger.fire_at, scheduled.timestamp());
    assert!(stub.received().is_empty(), "nothing is sent before the trigger fires");
}
