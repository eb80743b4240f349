use anyhow::Result;
use hyper::StatusCode;
use serde::Serialize;
use tracing::info;

use shared::types::InviteRequest;

use crate::auth::Identity;
use crate::database::utils::{is_valid_email, sanitize_string};
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json, read_json};
use crate::{AppState, HttpResponse, IncomingRequest};

const DEFAULT_SUBJECT: &str = "You're invited to join our partner program";

#[derive(Debug, Serialize)]
struct InviteSent {
    success: bool,
    message: &'static str,
}

/// `POST /api/admin/invite`
///
/// There is no mail transport; the invitation is logged and acknowledged.
pub async fn handle_invite(
    req: IncomingRequest,
    _state: AppState,
    identity: Identity,
) -> Result<HttpResponse> {
    let invite = read_json::<InviteRequest, _>(req.into_body())
        .await
        .unwrap_or_default();

    let email = sanitize_string(&invite.email);
    if email.is_empty() {
        return deliver_error_json("Email is required", StatusCode::BAD_REQUEST);
    }
    if !is_valid_email(&email) {
        return deliver_error_json("Invalid email address", StatusCode::BAD_REQUEST);
    }

    let subject = invite
        .subject
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

    info!(
        "Invitation from {} to {} <{}>: {:?} ({} chars of content)",
        identity.email,
        invite.name.as_deref().unwrap_or("-"),
        email,
        subject,
        invite.content.as_deref().map(str::len).unwrap_or(0)
    );

    deliver_serialized_json(
        &InviteSent {
            success: true,
            message: "Invitation sent successfully",
        },
        StatusCode::OK,
    )
}
