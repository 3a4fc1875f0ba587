//! Integration tests for the status workflows: leave decisions, proposal
//! submission and decisions, project completion and task moves.
//!
//! Every transition is checked for its HTTP status and for the emails it
//! queues in the outbox.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_client, create_user, outbox_for, post_json_auth, put_json_auth,
};
use crewline_core::client::ApprovalStatus;
use serde_json::{json, Value};
use sqlx::PgPool;

async fn file_leave(app: axum::Router, token: &str) -> i64 {
    let response = post_json_auth(
        app,
        "/api/leave",
        token,
        json!({
            "leaveType": "Annual",
            "startDate": "2026-07-01",
            "endDate": "2026-07-05",
            "reason": "Summer break"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn draft_proposal(app: axum::Router, token: &str) -> i64 {
    let response = post_json_auth(
        app,
        "/api/proposals",
        token,
        json!({ "title": "Warehouse retrofit", "value": 125000.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Leave
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn leave_approval_notifies_requester_once(pool: PgPool) {
    let (_, staff) = create_user(&pool, "leaver@example.com", "staff").await;
    let (manager, manager_token) = create_user(&pool, "boss@example.com", "manager").await;
    let app = common::build_test_app(pool.clone());
    let leave_id = file_leave(app.clone(), &staff).await;
    let uri = format!("/api/leave/{leave_id}/status");

    let approve = put_json_auth(
        app.clone(),
        &uri,
        &manager_token,
        json!({ "status": "approved", "note": "Enjoy" }),
    )
    .await;
    assert_eq!(approve.status(), StatusCode::OK);
    let json = body_json(approve).await;
    assert_eq!(json["data"]["status"], "approved");
    assert_eq!(json["data"]["decidedBy"], manager.id);
    assert_eq!(json["data"]["leaveType"], "annual");
    assert_eq!(outbox_for(&pool, "leaver@example.com").await.len(), 1);

    // A decided request cannot be decided again, and nothing more is sent.
    let again = put_json_auth(app, &uri, &manager_token, json!({ "status": "rejected" })).await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(again).await["code"], "INVALID_TRANSITION");
    assert_eq!(outbox_for(&pool, "leaver@example.com").await.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn staff_cannot_decide_leave(pool: PgPool) {
    let (_, requester) = create_user(&pool, "req@example.com", "staff").await;
    let (_, colleague) = create_user(&pool, "peer@example.com", "staff").await;
    let app = common::build_test_app(pool.clone());
    let leave_id = file_leave(app.clone(), &requester).await;

    let response = put_json_auth(
        app,
        &format!("/api/leave/{leave_id}/status"),
        &colleague,
        json!({ "status": "approved" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(outbox_for(&pool, "req@example.com").await.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn decided_leave_can_no_longer_be_edited(pool: PgPool) {
    let (_, staff) = create_user(&pool, "editor@example.com", "staff").await;
    let (_, manager) = create_user(&pool, "mgr@example.com", "manager").await;
    let app = common::build_test_app(pool);
    let leave_id = file_leave(app.clone(), &staff).await;
    let uri = format!("/api/leave/{leave_id}");

    let edit = put_json_auth(app.clone(), &uri, &staff, json!({ "reason": "Family trip" })).await;
    assert_eq!(edit.status(), StatusCode::OK);
    assert_eq!(body_json(edit).await["data"]["reason"], "Family trip");

    let decide = put_json_auth(
        app.clone(),
        &format!("{uri}/status"),
        &manager,
        json!({ "status": "rejected" }),
    )
    .await;
    assert_eq!(decide.status(), StatusCode::OK);

    let late_edit = put_json_auth(app, &uri, &staff, json!({ "reason": "Changed" })).await;
    assert_eq!(late_edit.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(late_edit).await["code"], "INVALID_STATE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn leave_with_inverted_dates_is_rejected(pool: PgPool) {
    let (_, staff) = create_user(&pool, "dates@example.com", "staff").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/leave",
        &staff,
        json!({ "leaveType": "sick", "startDate": "2026-07-05", "endDate": "2026-07-01" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_author_can_submit(pool: PgPool) {
    let (_, author) = create_user(&pool, "author@example.com", "staff").await;
    let (_, other) = create_user(&pool, "other@example.com", "staff").await;
    let (_, manager) = create_user(&pool, "sales-mgr@example.com", "manager").await;
    let app = common::build_test_app(pool.clone());
    let id = draft_proposal(app.clone(), &author).await;
    let uri = format!("/api/proposals/{id}/submit");

    let foreign = post_json_auth(app.clone(), &uri, &other, json!({})).await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    // Supervisors are not authors either.
    let supervisor = post_json_auth(app.clone(), &uri, &manager, json!({})).await;
    assert_eq!(supervisor.status(), StatusCode::FORBIDDEN);

    let own = post_json_auth(app, &uri, &author, json!({})).await;
    assert_eq!(own.status(), StatusCode::OK);
    let json = body_json(own).await;
    assert_eq!(json["data"]["status"], "Submitted");
    assert!(json["data"]["submittedAt"].is_string());
    assert_eq!(outbox_for(&pool, "sales-mgr@example.com").await.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deciding_a_draft_is_an_invalid_transition(pool: PgPool) {
    let (_, author) = create_user(&pool, "drafter@example.com", "staff").await;
    let (_, manager) = create_user(&pool, "decider@example.com", "manager").await;
    let app = common::build_test_app(pool);
    let id = draft_proposal(app.clone(), &author).await;

    let response = put_json_auth(
        app,
        &format!("/api/proposals/{id}/status"),
        &manager,
        json!({ "status": "Approved" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_TRANSITION");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn approving_records_the_approver_and_notifies_author(pool: PgPool) {
    let (_, author) = create_user(&pool, "writer@example.com", "staff").await;
    let (manager, manager_token) = create_user(&pool, "approver@example.com", "manager").await;
    let app = common::build_test_app(pool.clone());
    let id = draft_proposal(app.clone(), &author).await;

    let submit = post_json_auth(
        app.clone(),
        &format!("/api/proposals/{id}/submit"),
        &author,
        json!({}),
    )
    .await;
    assert_eq!(submit.status(), StatusCode::OK);

    let decide = put_json_auth(
        app.clone(),
        &format!("/api/proposals/{id}/status"),
        &manager_token,
        json!({ "status": "Approved", "note": "Go ahead" }),
    )
    .await;
    assert_eq!(decide.status(), StatusCode::OK);
    let json = body_json(decide).await;
    assert_eq!(json["data"]["status"], "Approved");
    assert_eq!(json["data"]["approvedBy"], manager.id);
    assert_eq!(json["data"]["decisionNote"], "Go ahead");
    assert_eq!(outbox_for(&pool, "writer@example.com").await.len(), 1);

    // Submitted proposals are frozen for their author.
    let edit = put_json_auth(
        app,
        &format!("/api/proposals/{id}"),
        &author,
        json!({ "title": "Changed" }),
    )
    .await;
    assert_eq!(edit.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Projects and tasks
// ---------------------------------------------------------------------------

struct ProjectFixture {
    project_id: i64,
    member_token: String,
    outsider_token: String,
    manager_token: String,
}

async fn project_with_clients(pool: &PgPool, app: axum::Router) -> ProjectFixture {
    let (_, manager_token) = create_user(pool, "pm@example.com", "manager").await;
    let (member, member_token) = create_user(pool, "member@example.com", "staff").await;
    let (_, outsider_token) = create_user(pool, "outsider@example.com", "staff").await;
    let (acme, _) = create_client(pool, "ops@acme.example", ApprovalStatus::Approved).await;
    let (globex, _) = create_client(pool, "pm@globex.example", ApprovalStatus::Approved).await;

    let team = post_json_auth(
        app.clone(),
        "/api/teams",
        &manager_token,
        json!({ "name": "Site crew" }),
    )
    .await;
    assert_eq!(team.status(), StatusCode::CREATED);
    let team_id = body_json(team).await["data"]["id"].as_i64().unwrap();

    let add = post_json_auth(
        app.clone(),
        &format!("/api/teams/{team_id}/members"),
        &manager_token,
        json!({ "userId": member.id }),
    )
    .await;
    assert_eq!(add.status(), StatusCode::CREATED);

    let project = post_json_auth(
        app,
        "/api/projects",
        &manager_token,
        json!({
            "name": "Depot rebuild",
            "startDate": "2026-05-01",
            "dueDate": "2026-09-30",
            "teamIds": [team_id],
            "clientIds": [acme.id, globex.id]
        }),
    )
    .await;
    assert_eq!(project.status(), StatusCode::CREATED);
    let json: Value = body_json(project).await;
    assert_eq!(json["data"]["teams"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["clients"].as_array().unwrap().len(), 2);

    ProjectFixture {
        project_id: json["data"]["id"].as_i64().unwrap(),
        member_token,
        outsider_token,
        manager_token,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completing_a_project_notifies_each_client_once(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let fixture = project_with_clients(&pool, app.clone()).await;
    let uri = format!("/api/projects/{}/status", fixture.project_id);

    let done = post_json_auth(app.clone(), &uri, &fixture.member_token, json!({ "status": "Done" })).await;
    assert_eq!(done.status(), StatusCode::OK);
    assert_eq!(body_json(done).await["data"]["status"], "Done");
    assert_eq!(outbox_for(&pool, "ops@acme.example").await.len(), 1);
    assert_eq!(outbox_for(&pool, "pm@globex.example").await.len(), 1);

    // Done -> Done changes nothing and sends nothing.
    let again = put_json_auth(app, &uri, &fixture.member_token, json!({ "status": "Done" })).await;
    assert_eq!(again.status(), StatusCode::OK);
    assert_eq!(outbox_for(&pool, "ops@acme.example").await.len(), 1);
    assert_eq!(outbox_for(&pool, "pm@globex.example").await.len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_member_cannot_move_project(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let fixture = project_with_clients(&pool, app.clone()).await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/projects/{}/status", fixture.project_id),
        &fixture.outsider_token,
        json!({ "status": "In Progress" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(outbox_for(&pool, "ops@acme.example").await.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_project_status_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let fixture = project_with_clients(&pool, app.clone()).await;

    let response = put_json_auth(
        app,
        &format!("/api/projects/{}/status", fixture.project_id),
        &fixture.member_token,
        json!({ "status": "Archived" }),
    )
    .await;

    assert!(response.status().is_client_error());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assignee_moves_task_and_others_cannot(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let fixture = project_with_clients(&pool, app.clone()).await;
    let member = crewline_db::repositories::UserRepo::find_by_email(&pool, "member@example.com")
        .await
        .unwrap()
        .unwrap();

    let task = post_json_auth(
        app.clone(),
        &format!("/api/projects/{}/tasks", fixture.project_id),
        &fixture.manager_token,
        json!({ "title": "Pour foundations", "assigneeId": member.id }),
    )
    .await;
    assert_eq!(task.status(), StatusCode::CREATED);
    let task_id = body_json(task).await["data"]["id"].as_i64().unwrap();
    assert_eq!(outbox_for(&pool, "member@example.com").await.len(), 1);

    let uri = format!("/api/tasks/{task_id}/status");
    let outsider = put_json_auth(
        app.clone(),
        &uri,
        &fixture.outsider_token,
        json!({ "status": "In Progress" }),
    )
    .await;
    assert_eq!(outsider.status(), StatusCode::FORBIDDEN);

    let assignee = put_json_auth(app, &uri, &fixture.member_token, json!({ "status": "In Progress" })).await;
    assert_eq!(assignee.status(), StatusCode::OK);
    assert_eq!(body_json(assignee).await["data"]["status"], "In Progress");
}
