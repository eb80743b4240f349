#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, header};
use tower::ServiceExt;

use server::auth::{AUTH_COOKIE, FixedClock, SessionSubject, TokenCodec};
use server::database::{self, admins, utils};
use server::{AppService, AppState, HttpResponse, IncomingRequest, build_service};
use shared::types::jwt::Role;
use shared::types::server_config::AppConfig;

pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const NOW: u64 = 1_700_000_000;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub service: AppService,
    pub state: AppState,
}

impl TestApp {
    /// Fresh in-memory database with one admin, web dir pointing at `web_dir`.
    pub async fn new(web_dir: &str) -> Self {
        Self::with_clock(web_dir, NOW).await
    }

    pub async fn with_clock(web_dir: &str, now: u64) -> Self {
        let mut config = AppConfig::default();
        config.paths.web_dir = web_dir.to_string();

        let db = database::open("sqlite::memory:").await.unwrap();
        let hash = utils::hash_password(ADMIN_PASSWORD).unwrap();
        admins::upsert_admin(&db, ADMIN_EMAIL, &hash).await.unwrap();

        let codec = TokenCodec::with_clock(SECRET, Arc::new(FixedClock(now)));
        let state = AppState::new(config, db, codec);
        let service = build_service(state.clone());
        Self { service, state }
    }

    pub async fn send(&self, req: IncomingRequest) -> HttpResponse {
        self.service.clone().oneshot(req).await.unwrap()
    }
}

pub fn request(method: Method, path: &str, cookie: Option<&str>) -> IncomingRequest {
    request_with_body(method, path, cookie, None)
}

pub fn json_request(
    method: Method,
    path: &str,
    cookie: Option<&str>,
    body: serde_json::Value,
) -> IncomingRequest {
    request_with_body(method, path, cookie, Some(body.to_string()))
}

fn request_with_body(
    method: Method,
    path: &str,
    cookie: Option<&str>,
    body: Option<String>,
) -> IncomingRequest {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("{}={}", AUTH_COOKIE, token));
    }
    if body.is_some() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    builder
        .body(
            Full::new(Bytes::from(body.unwrap_or_default()))
                .map_err(|never| match never {})
                .boxed_unsync(),
        )
        .unwrap()
}

/// Token signed with the shared test secret at `NOW`.
pub fn token_for(role: Role, email: &str) -> String {
    TokenCodec::with_clock(SECRET, Arc::new(FixedClock(NOW)))
        .issue(&SessionSubject {
            id: "test-subject".into(),
            email: email.into(),
            role,
            name: "Test".into(),
        })
        .unwrap()
}

/// The `auth_token` value from a `Set-Cookie` header, if any.
pub fn session_token(res: &HttpResponse) -> Option<String> {
    let cookie = res.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let (name, value) = cookie.split(';').next()?.split_once('=')?;
    (name == AUTH_COOKIE).then(|| value.to_string())
}

pub async fn body_json(res: HttpResponse) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(res: HttpResponse) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Sign up a partner through the API and return its session token.
pub async fn signup_partner(app: &TestApp, name: &str, email: &str) -> String {
    let res = app
        .send(json_request(
            Method::POST,
            "/api/auth/signup",
            None,
            serde_json::json!({
                "name": name,
                "email": email,
                "phone": "555-0100",
                "password": "partner-password",
            }),
        ))
        .await;
    assert_eq!(res.status(), hyper::StatusCode::OK);
    session_token(&res).unwrap()
}
