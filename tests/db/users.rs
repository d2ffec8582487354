//! Users, teams and active recipient selection

#[path = "../common/mod.rs"]
mod common;

use common::*;
use motdujour::error::AppError;
use motdujour::recipients;

#[test]
fn test_create_user_normalizes_input() {
    let conn = setup_test_db();
    let input = CreateUser {
        email: "  Marie@Example.FR ".to_string(),
        name: Some("Marie".to_string()),
        phone_number: Some("   ".to_string()),
        phone_country: Some("33".to_string()),
        role: "gift".to_string(),
    };

    let user = queries::create_user(&conn, &input).unwrap();

    assert!(user.id.starts_with("mdj_usr_"));
    assert_eq!(user.email, "marie@example.fr", "email should be trimmed and lowercased");
    assert_eq!(user.phone_number, None, "blank phone should be stored as NULL");

    let fetched = find_active_user(&conn, &user.id).expect("user should exist");
    assert_eq!(fetched.role, "gift");
    assert_eq!(fetched.phone_country.as_deref(), Some("33"));
}

#[test]
fn test_create_user_rejects_bad_email() {
    let conn = setup_test_db();
    let input = CreateUser {
        email: "not-an-email".to_string(),
        name: None,
        phone_number: None,
        phone_country: None,
        role: "owner".to_string(),
    };

    let err = queries::create_user(&conn, &input).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "got {err:?}");
    assert_eq!(queries::count_users(&conn).unwrap(), 0);
}

#[test]
fn test_active_filter_requires_both_phone_fields() {
    let conn = setup_test_db();

    let reachable = create_test_user(&conn, "a@example.fr", Some(("33", "0612345678")));
    create_test_user(&conn, "b@example.fr", None);

    // Rows written by other tools may carry empty strings instead of NULL
    conn.execute(
        "INSERT INTO users (id, email, phone_number, phone_country, role, created_at, updated_at)
         VALUES ('legacy-1', 'c@example.fr', '0611111111', '', 'owner', 0, 0),
                ('legacy-2', 'd@example.fr', NULL, '33', 'owner', 0, 0)",
        [],
    )
    .unwrap();

    let active = recipients::list_active(&conn).unwrap();

    assert_eq!(active.len(), 1, "only users with both phone fields are eligible");
    assert_eq!(active[0].user_id, reachable.id);
    assert_eq!(active[0].phone_number, "33612345678", "leading zero should be stripped");
}

#[test]
fn test_soft_deleted_users_are_not_recipients() {
    let conn = setup_test_db();
    let user = create_reachable_user(&conn, "gone@example.fr");

    assert!(soft_delete_user(&conn, &user.id));

    assert!(recipients::list_active(&conn).unwrap().is_empty());
    assert!(find_active_user(&conn, &user.id).is_none());
    assert_eq!(queries::count_users(&conn).unwrap(), 0, "deleted users are not counted");
    assert!(!soft_delete_user(&conn, &user.id), "second soft delete is a no-op");
}

#[test]
fn test_recipients_carry_team_plan() {
    let conn = setup_test_db();
    let team = create_test_team(&conn, "Family", "active");

    let member = create_reachable_user(&conn, "member@example.fr");
    queries::add_team_member(&conn, &team.id, &member.id, "family").unwrap();
    let solo = create_test_user(&conn, "solo@example.fr", Some(("1", "5551234567")));

    let active = recipients::list_active(&conn).unwrap();
    assert_eq!(active.len(), 2);

    let member_row = active.iter().find(|r| r.user_id == member.id).unwrap();
    assert_eq!(member_row.plan_name.as_deref(), Some("Family"));
    assert_eq!(member_row.subscription_status.as_deref(), Some("active"));

    let solo_row = active.iter().find(|r| r.user_id == solo.id).unwrap();
    assert_eq!(solo_row.plan_name, None, "users without a team have no plan");
    assert_eq!(solo_row.phone_number, "15551234567");

    let (plan, status) = team_plan(&conn, &team.id);
    assert_eq!(plan.as_deref(), Some("Family"));
    assert_eq!(status.as_deref(), Some("active"));
}

#[test]
fn test_recipients_use_first_joined_team() {
    let conn = setup_test_db();
    let first = create_test_team(&conn, "Personal", "active");
    let second = create_test_team(&conn, "Family", "past_due");
    let user = create_reachable_user(&conn, "both@example.fr");

    queries::add_team_member(&conn, &first.id, &user.id, "owner").unwrap();
    queries::add_team_member(&conn, &second.id, &user.id, "member").unwrap();

    let active = recipients::list_active(&conn).unwrap();
    assert_eq!(active.len(), 1, "multiple teams must not duplicate a recipient");
    assert_eq!(active[0].plan_name.as_deref(), Some("Personal"));
}

#[test]
fn test_recipients_ordered_by_creation() {
    let conn = setup_test_db();
    let a = create_reachable_user(&conn, "a@example.fr");
    let b = create_reachable_user(&conn, "b@example.fr");
    let c = create_reachable_user(&conn, "c@example.fr");

    let ids: Vec<String> = recipients::list_active(&conn)
        .unwrap()
        .into_iter()
        .map(|r| r.user_id)
        .collect();

    assert_eq!(ids, vec![a.id, b.id, c.id]);
}
