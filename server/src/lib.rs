//! Referral portal server.
//!
//! Every request passes through a small tower stack before it reaches the
//! [`Router`](handlers::http::routes::Router):
//!
//! ```text
//! TimeoutLayer -> AccessGatewayLayer -> Router -> handlers -> sqlx (SQLite)
//! ```
//!
//! The access gateway reads the `auth_token` cookie, verifies it with the
//! [`TokenCodec`], classifies the path with the [`PathPolicy`] and either
//! forwards the request with an [`Identity`](auth::Identity) attached or
//! answers with a redirect / JSON error on its own.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::combinators::{BoxBody, UnsyncBoxBody};
use hyper::{Request, Response};
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower::util::BoxCloneService;

use shared::types::server_config::AppConfig;

pub mod auth;
pub mod database;
pub mod handlers;
pub mod tower_middle;

use auth::{AccessGateway, PathPolicy, TokenCodec};
use handlers::http::routes::{Router, build_router};
use tower_middle::{AccessGatewayLayer, TimeoutLayer};

/// Response type produced by every handler and middleware layer.
pub type HttpResponse = Response<BoxBody<Bytes, Infallible>>;

/// Request body once it has been erased from hyper's `Incoming`.
pub type ReqBody = UnsyncBoxBody<Bytes, hyper::Error>;

pub type IncomingRequest = Request<ReqBody>;

/// The fully layered service handed to hyper.
pub type AppService = BoxCloneService<IncomingRequest, HttpResponse, Infallible>;

/// Shared, cheaply clonable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(config: AppConfig, db: SqlitePool, codec: TokenCodec) -> Self {
        Self {
            config: Arc::new(config),
            db,
            codec: Arc::new(codec),
        }
    }
}

/// Build the tower stack: timeout, then access gateway, then router.
pub fn build_service(state: AppState) -> AppService {
    let router = Arc::new(build_router());
    build_service_with_router(state, router)
}

/// Same as [`build_service`] with a caller supplied router.
pub fn build_service_with_router(state: AppState, router: Arc<Router>) -> AppService {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);
    let gateway = AccessGateway::new(state.codec.clone(), PathPolicy::standard());

    let service = ServiceBuilder::new()
        .layer(TimeoutLayer::new(timeout))
        .layer(AccessGatewayLayer::new(gateway))
        .service_fn(move |req: IncomingRequest| {
            let router = router.clone();
            let state = state.clone();
            async move { Ok::<_, Infallible>(router.dispatch(req, state).await) }
        });

    BoxCloneService::new(service)
}
