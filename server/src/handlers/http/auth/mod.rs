pub mod login;
pub mod logout;
pub mod signup;

pub use login::handle_login;
pub use logout::handle_logout;
pub use signup::handle_signup;

use std::time::Duration;

use anyhow::{Context, Result};
use hyper::header::HeaderValue;

use crate::AppState;
use crate::auth::{AUTH_COOKIE, SESSION_TTL_SECS, SessionSubject};
use crate::handlers::http::utils;

/// Issue a session token for `subject` and wrap it in the `auth_token`
/// cookie.  `Secure` follows `server.production`.
pub(crate) fn session_cookie(state: &AppState, subject: &SessionSubject) -> Result<HeaderValue> {
    let token = state
        .codec
        .issue(subject)
        .context("Failed to issue session token")?;

    utils::create_persistent_cookie(
        AUTH_COOKIE,
        &token,
        Duration::from_secs(SESSION_TTL_SECS),
        state.config.server.production,
    )
    .context("Failed to create session cookie")
}
