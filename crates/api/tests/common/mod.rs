#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use crewline_api::auth::jwt::{generate_access_token, JwtConfig, SubjectKind, TokenSubject};
use crewline_api::auth::password::hash_password;
use crewline_api::config::{ServerConfig, StorageConfig};
use crewline_api::router::build_app_router;
use crewline_api::state::AppState;
use crewline_api::storage::LocalStorage;
use crewline_core::client::ApprovalStatus;
use crewline_db::models::client::{Client, CreateClient};
use crewline_db::models::outbox::OutboxMessage;
use crewline_db::models::user::{CreateUser, User};
use crewline_db::repositories::{ClientRepo, OutboxRepo, RoleRepo, UserRepo};

pub const TEST_PASSWORD: &str = "Password123";

/// Build a test `ServerConfig` with a fixed JWT secret and a throwaway
/// upload directory.
pub fn test_config() -> ServerConfig {
    let storage_dir: PathBuf =
        std::env::temp_dir().join(format!("crewline-test-{}", uuid::Uuid::new_v4()));
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        outbox_poll_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            access_token_expiry_mins: 60,
        },
        storage: StorageConfig {
            dir: storage_dir,
            public_base_url: "http://localhost:3000/files".to_string(),
            max_upload_bytes: 1024 * 1024,
        },
    }
}

/// Build the full application router, middleware included, on `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_storage(pool).0
}

/// Like [`build_test_app`], also returning the upload directory.
pub fn build_test_app_with_storage(pool: PgPool) -> (Router, PathBuf) {
    let config = test_config();
    let storage = Arc::new(LocalStorage::new(
        config.storage.dir.clone(),
        config.storage.public_base_url.clone(),
    ));
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        storage,
    };
    let dir = config.storage.dir.clone();
    (build_app_router(state, &config), dir)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    request(method, uri, token)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        request(Method::GET, uri, Some(token)).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, None, body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::POST, uri, Some(token), body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, json_request(Method::PUT, uri, Some(token), body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        request(Method::DELETE, uri, Some(token)).body(Body::empty()).unwrap(),
    )
    .await
}

/// A `multipart/form-data` body built field by field.
pub struct MultipartBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("crewline-{}", uuid::Uuid::new_v4().simple()),
            bytes: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        let part = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
            self.boundary
        );
        self.bytes.extend_from_slice(part.as_bytes());
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        let head = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
            self.boundary
        );
        self.bytes.extend_from_slice(head.as_bytes());
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        let tail = format!("--{}--\r\n", self.boundary);
        self.bytes.extend_from_slice(tail.as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.bytes,
        )
    }
}

pub async fn post_multipart(
    app: Router,
    uri: &str,
    token: Option<&str>,
    form: MultipartBody,
) -> Response<Body> {
    let (content_type, bytes) = form.finish();
    let request = request(Method::POST, uri, token)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with [`TEST_PASSWORD`] directly and return it with a valid
/// access token.
pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> (User, String) {
    let role = RoleRepo::find_by_name(pool, role).await.unwrap().unwrap();
    let user = UserRepo::create(
        pool,
        &CreateUser {
            first_name: "Test".into(),
            last_name: email.split('@').next().unwrap().into(),
            email: email.into(),
            phone_number: unique_phone(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role_id: role.id,
            image_url: None,
        },
    )
    .await
    .unwrap();
    let token = token_for(&user);
    (user, token)
}

/// Phone numbers are unique per table.
pub fn unique_phone() -> String {
    format!("+1{:010}", uuid::Uuid::new_v4().as_u128() % 10_000_000_000)
}

pub fn token_for(user: &User) -> String {
    generate_access_token(
        TokenSubject {
            id: user.id,
            kind: SubjectKind::User,
            role: &user.role,
            permissions: &user.permissions,
        },
        &test_config().jwt,
    )
    .unwrap()
}

/// Insert a client in `status`, returning it with a client token.
pub async fn create_client(pool: &PgPool, email: &str, status: ApprovalStatus) -> (Client, String) {
    let client = ClientRepo::create(
        pool,
        &CreateClient {
            company_name: format!("{} Ltd", email.split('@').next().unwrap()),
            contact_name: "Casey Contact".into(),
            email: email.into(),
            phone_number: unique_phone(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            document_url: None,
        },
    )
    .await
    .unwrap();
    sqlx::query("UPDATE clients SET approval_status = $2 WHERE id = $1")
        .bind(client.id)
        .bind(status.as_str())
        .execute(pool)
        .await
        .unwrap();
    let client = ClientRepo::find_by_id(pool, client.id).await.unwrap().unwrap();
    let token = generate_access_token(
        TokenSubject {
            id: client.id,
            kind: SubjectKind::Client,
            role: "client",
            permissions: &[],
        },
        &test_config().jwt,
    )
    .unwrap();
    (client, token)
}

pub async fn outbox_for(pool: &PgPool, recipient: &str) -> Vec<OutboxMessage> {
    OutboxRepo::list_for_recipient(pool, recipient).await.unwrap()
}
