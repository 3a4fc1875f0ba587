//! Integration tests for the resource endpoints: health, pagination, user
//! administration, client onboarding, uploads, finance and the audit log.

mod common;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use common::{
    body_json, body_text, create_client, create_user, delete_auth, get, get_auth, outbox_for,
    post_json, post_json_auth, post_multipart, put_json_auth, MultipartBody, TEST_PASSWORD,
};
use crewline_core::client::ApprovalStatus;
use crewline_core::pagination::MAX_LIMIT;
use crewline_db::models::team::CreateTeam;
use crewline_db::repositories::TeamRepo;
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Health and routing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_check_returns_ok_with_json(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["dbHealthy"], true);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_route_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn responses_carry_a_request_id(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/health").await;

    assert!(response.headers().contains_key("x-request-id"));
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_pagination_reports_totals(pool: PgPool) {
    let (_, token) = create_user(&pool, "pager@example.com", "staff").await;
    for i in 0..25 {
        TeamRepo::create(
            &pool,
            &CreateTeam {
                name: format!("Team {i:02}"),
                description: None,
            },
        )
        .await
        .unwrap();
    }
    let app = common::build_test_app(pool);

    let response = get_auth(app.clone(), "/api/teams?page=3&limit=10", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 5);
    assert_eq!(json["pagination"]["currentPage"], 3);
    assert_eq!(json["pagination"]["totalPages"], 3);
    assert_eq!(json["pagination"]["totalItems"], 25);
    assert_eq!(json["pagination"]["itemsPerPage"], 10);

    // Out-of-range limits are clamped rather than rejected.
    let clamped = get_auth(app, "/api/teams?page=0&limit=100000", &token).await;
    assert_eq!(clamped.status(), StatusCode::OK);
    let json = body_json(clamped).await;
    assert_eq!(json["pagination"]["currentPage"], 1);
    assert_eq!(json["pagination"]["itemsPerPage"], MAX_LIMIT);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_user_and_credentials_are_emailed(pool: PgPool) {
    let (_, admin) = create_user(&pool, "root@example.com", "admin").await;
    let app = common::build_test_app(pool.clone());

    let response = post_json_auth(
        app.clone(),
        "/api/users",
        &admin,
        json!({
            "firstName": "Dana",
            "lastName": "Mills",
            "email": "dana@example.com",
            "phoneNumber": "+1 555 010 2030",
            "role": "manager"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "manager");
    assert_eq!(outbox_for(&pool, "dana@example.com").await.len(), 1);

    let bad_role = post_json_auth(
        app,
        "/api/users",
        &admin,
        json!({
            "firstName": "Eve",
            "lastName": "Stone",
            "email": "eve@example.com",
            "phoneNumber": "+1 555 010 4040",
            "role": "client"
        }),
    )
    .await;
    assert_eq!(bad_role.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn staff_cannot_list_users_and_forbidden_hides_existence(pool: PgPool) {
    let (_, staff) = create_user(&pool, "nosy@example.com", "staff").await;
    let app = common::build_test_app(pool);

    let list = get_auth(app.clone(), "/api/users", &staff).await;
    assert_eq!(list.status(), StatusCode::FORBIDDEN);

    let missing = delete_auth(app, "/api/users/999999", &staff).await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_cannot_delete_self(pool: PgPool) {
    let (admin, token) = create_user(&pool, "self@example.com", "admin").await;
    let app = common::build_test_app(pool);

    let response = delete_auth(app, &format!("/api/users/{}", admin.id), &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_onboarding_requires_approval(pool: PgPool) {
    let (_, admin) = create_user(&pool, "approver@example.com", "admin").await;
    let app = common::build_test_app(pool.clone());

    let form = MultipartBody::new()
        .text("companyName", "Initech")
        .text("contactName", "Bill Lumbergh")
        .text("email", "bill@initech.example")
        .text("phoneNumber", "+1 555 0199 123")
        .text("password", TEST_PASSWORD)
        .file("document", "licence.pdf", "application/pdf", b"%PDF-1.4 test");
    let register = post_multipart(app.clone(), "/api/clients/register", None, form).await;
    assert_eq!(register.status(), StatusCode::CREATED);
    let json = body_json(register).await;
    assert_eq!(json["data"]["approvalStatus"], "pending");
    assert!(json["data"]["documentUrl"].as_str().unwrap().ends_with(".pdf"));
    let client_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(outbox_for(&pool, "approver@example.com").await.len(), 1);

    let credentials = json!({ "email": "bill@initech.example", "password": TEST_PASSWORD });
    let pending = post_json(app.clone(), "/api/clients/login", credentials.clone()).await;
    assert_eq!(pending.status(), StatusCode::FORBIDDEN);

    let approve = put_json_auth(
        app.clone(),
        &format!("/api/clients/{client_id}/approval"),
        &admin,
        json!({ "status": "approved" }),
    )
    .await;
    assert_eq!(approve.status(), StatusCode::OK);
    assert_eq!(body_json(approve).await["data"]["approvalStatus"], "approved");
    assert_eq!(outbox_for(&pool, "bill@initech.example").await.len(), 1);

    let login = post_json(app.clone(), "/api/clients/login", credentials).await;
    assert_eq!(login.status(), StatusCode::OK);
    let json = body_json(login).await;
    let token = json["accessToken"].as_str().unwrap().to_string();

    let me = get_auth(app.clone(), "/api/clients/me", &token).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["data"]["companyName"], "Initech");

    // Deciding twice is not allowed.
    let again = put_json_auth(
        app,
        &format!("/api/clients/{client_id}/approval"),
        &admin,
        json!({ "status": "rejected" }),
    )
    .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_registration_with_taken_phone_stores_no_document(pool: PgPool) {
    let (existing, _) = create_client(&pool, "first@acme.example", ApprovalStatus::Approved).await;
    let (app, upload_dir) = common::build_test_app_with_storage(pool.clone());

    let form = MultipartBody::new()
        .text("companyName", "Acme Two")
        .text("contactName", "Wile Coyote")
        .text("email", "second@acme.example")
        .text("phoneNumber", &existing.phone_number)
        .text("password", TEST_PASSWORD)
        .file("document", "licence.pdf", "application/pdf", b"%PDF-1.4 second");
    let response = post_multipart(app, "/api/clients/register", None, form).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("uq_clients_phone"));
    assert!(!upload_dir.join("clients").exists());
    assert!(outbox_for(&pool, "second@acme.example").await.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_token_is_rejected_on_staff_routes(pool: PgPool) {
    let (_, client_token) = create_client(&pool, "buyer@client.example", ApprovalStatus::Approved).await;
    let (_, staff_token) = create_user(&pool, "worker@example.com", "staff").await;
    let app = common::build_test_app(pool);

    let staff_route = get_auth(app.clone(), "/api/teams", &client_token).await;
    assert_eq!(staff_route.status(), StatusCode::FORBIDDEN);

    let client_route = get_auth(app.clone(), "/api/clients/me", &staff_token).await;
    assert_eq!(client_route.status(), StatusCode::FORBIDDEN);

    let projects = get_auth(app, "/api/clients/me/projects", &client_token).await;
    assert_eq!(projects.status(), StatusCode::OK);
    assert_eq!(body_json(projects).await["items"].as_array().unwrap().len(), 0);
}

// ---------------------------------------------------------------------------
// HSE
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn critical_report_escalates_to_admins(pool: PgPool) {
    let (_, reporter) = create_user(&pool, "field@example.com", "staff").await;
    create_user(&pool, "safety-mgr@example.com", "manager").await;
    create_user(&pool, "ceo@example.com", "admin").await;
    let app = common::build_test_app(pool.clone());

    let form = MultipartBody::new()
        .text("title", "Scaffold collapse")
        .text("description", "Section B scaffold gave way")
        .text("severity", "critical")
        .text("incidentDate", "2026-06-02")
        .text("location", "Depot B");
    let response = post_multipart(app.clone(), "/api/hse/reports", Some(&reporter), form).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "open");
    let report_id = json["data"]["id"].as_i64().unwrap();
    assert_eq!(outbox_for(&pool, "safety-mgr@example.com").await.len(), 1);
    assert_eq!(outbox_for(&pool, "ceo@example.com").await.len(), 1);

    // Reporters can read their own report but not the register.
    let own = get_auth(app.clone(), &format!("/api/hse/reports/{report_id}"), &reporter).await;
    assert_eq!(own.status(), StatusCode::OK);
    let register = get_auth(app, "/api/hse/reports", &reporter).await;
    assert_eq!(register.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn document_upload_rejects_disallowed_extension(pool: PgPool) {
    let (_, manager) = create_user(&pool, "docs@example.com", "manager").await;
    let app = common::build_test_app(pool);

    let form = MultipartBody::new()
        .text("title", "Site induction")
        .text("category", "policy")
        .file("file", "induction.exe", "application/octet-stream", b"MZ");
    let response = post_multipart(app, "/api/hse/documents", Some(&manager), form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn expenses_list_includes_currency_totals(pool: PgPool) {
    let (_, manager) = create_user(&pool, "finance@example.com", "manager").await;
    let app = common::build_test_app(pool);

    for (amount, currency) in [(100.0, "usd"), (50.5, "USD"), (20.0, "EUR")] {
        let response = post_json_auth(
            app.clone(),
            "/api/finance/expenses",
            &manager,
            json!({
                "description": "Site supplies",
                "amount": amount,
                "currency": currency,
                "spentOn": "2026-06-10"
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let zero = post_json_auth(
        app.clone(),
        "/api/finance/expenses",
        &manager,
        json!({ "description": "Nothing", "amount": 0, "spentOn": "2026-06-10" }),
    )
    .await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(app, "/api/finance/expenses", &manager).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 3);
    assert_eq!(json["pagination"]["totalItems"], 3);
    let totals = json["totals"].as_array().unwrap();
    let usd = totals.iter().find(|t| t["currency"] == "USD").unwrap();
    assert_eq!(usd["amount"], 150.5);
    let eur = totals.iter().find(|t| t["currency"] == "EUR").unwrap();
    assert_eq!(eur["amount"], 20.0);
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn mutations_are_audited_and_exportable(pool: PgPool) {
    let (_, admin) = create_user(&pool, "auditor@example.com", "admin").await;
    let app = common::build_test_app(pool);

    let team = post_json_auth(app.clone(), "/api/teams", &admin, json!({ "name": "Audited" })).await;
    assert_eq!(team.status(), StatusCode::CREATED);

    let list = get_auth(app.clone(), "/api/audits?model=Team&action=create", &admin).await;
    assert_eq!(list.status(), StatusCode::OK);
    let json = body_json(list).await;
    assert_eq!(json["pagination"]["totalItems"], 1);
    assert_eq!(json["items"][0]["userEmail"], "auditor@example.com");

    let export = get_auth(app, "/api/audits/export", &admin).await;
    assert_eq!(export.status(), StatusCode::OK);
    assert_eq!(
        export.headers()[CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert!(export.headers()[CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("audit-logs.csv"));
    let csv = body_text(export).await;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("id,action,model,recordId,user.email,ipAddress,createdAt")
    );
    assert!(lines.any(|line| line.contains(",create,Team,")));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn managers_cannot_read_audits(pool: PgPool) {
    let (_, manager) = create_user(&pool, "curious@example.com", "manager").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app, "/api/audits", &manager).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
