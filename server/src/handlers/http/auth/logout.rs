use anyhow::{Context, Result};
use hyper::StatusCode;
use tracing::info;

use crate::auth::AUTH_COOKIE;
use crate::handlers::http::utils;
use crate::{AppState, HttpResponse, IncomingRequest};

/// `POST /api/auth/logout`
///
/// Sessions are stateless, so logging out only expires the cookie.
pub async fn handle_logout(_req: IncomingRequest, state: AppState) -> Result<HttpResponse> {
    info!("Processing logout request");

    let cookie = utils::delete_cookie(AUTH_COOKIE, state.config.server.production)
        .context("Failed to create logout cookie")?;

    utils::deliver_json_with_cookie(
        &serde_json::json!({ "success": true }),
        StatusCode::OK,
        cookie,
    )
}
