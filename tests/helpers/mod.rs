#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use billing::auth::identity::IdentityProvider;
use billing::billing::company::{self, NewCompany};
use billing::billing::user::{self, NewUser};
use billing::billing::vendor::{self, NewVendor};
use billing::config::Config;
use billing::render::Templates;
use billing::store::AppState;

pub const ADMIN_EMAIL: &str = "admin@test.com";
pub const IDENTITY_HEADER: &str = "x-forwarded-email";
const BOUNDARY: &str = "billing-test-boundary";

/// Build a test `AppState` from the given pool.
///
/// - Uses in-memory object storage (no `MinIO` required)
/// - `ADMIN_EMAIL` is the only administrator
pub fn test_state(pool: PgPool) -> AppState {
    let blobs = opendal::Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish();

    let config = Config {
        listen: "127.0.0.1:0".into(),
        database_url: "postgres://localhost/test".into(),
        minio_endpoint: "http://localhost:9000".into(),
        minio_access_key: "test".into(),
        minio_secret_key: "test".into(),
        blob_bucket: "billing-test".into(),
        identity_header: IDENTITY_HEADER.into(),
        admin_emails: vec![ADMIN_EMAIL.into()],
        login_url: "/oauth2/start?rd=%2Flogin".into(),
        logout_url: "/oauth2/sign_out".into(),
        max_upload_bytes: 1024 * 1024,
        dev_mode: true,
    };
    let identity = IdentityProvider::from_config(&config).expect("identity provider");

    AppState {
        pool,
        blobs,
        templates: Arc::new(Templates::load()),
        identity: Arc::new(identity),
        config: Arc::new(config),
    }
}

/// Build the full router with the given state.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(billing::web::router(&state))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_company(pool: &PgPool, name: &str) -> Uuid {
    company::create(
        pool,
        &NewCompany {
            name,
            created_by: ADMIN_EMAIL,
        },
    )
    .await
    .expect("create company")
}

pub async fn create_user(pool: &PgPool, email: &str, company_id: Uuid) -> Uuid {
    user::create(
        pool,
        &NewUser {
            email,
            company_id: &company_id.to_string(),
            created_by: ADMIN_EMAIL,
        },
    )
    .await
    .expect("create user")
}

pub async fn create_vendor(pool: &PgPool, name: &str, company_id: Uuid) -> Uuid {
    vendor::create(
        pool,
        &NewVendor {
            name,
            company_id: &company_id.to_string(),
            created_by: ADMIN_EMAIL,
        },
    )
    .await
    .expect("create vendor")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn location(&self) -> &str {
        self.headers
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

fn builder(method: &str, path: &str, email: &str) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(path);
    if !email.is_empty() {
        builder = builder.header(IDENTITY_HEADER, email);
    }
    builder
}

/// Send a GET as `email`. An empty email is an anonymous request.
pub async fn get(app: &Router, email: &str, path: &str) -> TestResponse {
    send(app, builder("GET", path, email).body(Body::empty()).unwrap()).await
}

/// Send a url-encoded form POST as `email`.
pub async fn post_form(app: &Router, email: &str, path: &str, body: &str) -> TestResponse {
    let req = builder("POST", path, email)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap();
    send(app, req).await
}

/// Send a multipart POST as `email` with text fields and an optional file.
pub async fn post_multipart(
    app: &Router,
    email: &str,
    path: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> TestResponse {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let req = builder("POST", path, email)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, req).await
}
