use anyhow::{Context, Result};
use hyper::StatusCode;
use tracing::warn;

use shared::types::NewReferral;

use crate::database::affiliates::Affiliate;
use crate::database::referrals;
use crate::database::utils::sanitize_string;
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json, read_json};
use crate::{AppState, HttpResponse, IncomingRequest};

/// `GET /api/partner/referrals`, newest first.
pub async fn handle_list_referrals(state: AppState, partner: Affiliate) -> Result<HttpResponse> {
    let rows = referrals::list_for_partner(&state.db, &partner.id)
        .await
        .context("Failed to list referrals")?;
    deliver_serialized_json(&rows, StatusCode::OK)
}

/// `POST /api/partner/referrals` `{name, email, phone}` -> 201 with the
/// created `pending` referral.
pub async fn handle_create_referral(
    req: IncomingRequest,
    state: AppState,
    partner: Affiliate,
) -> Result<HttpResponse> {
    let referral = match read_json::<NewReferral, _>(req.into_body()).await {
        Some(r) => NewReferral {
            name: sanitize_string(&r.name),
            email: sanitize_string(&r.email),
            phone: sanitize_string(&r.phone),
        },
        None => {
            warn!("Bad referral body from {}", partner.email);
            return deliver_error_json("Invalid request", StatusCode::BAD_REQUEST);
        }
    };

    if referral.name.is_empty() || referral.email.is_empty() {
        return deliver_error_json("Invalid request", StatusCode::BAD_REQUEST);
    }

    let created = referrals::create_referral(
        &state.db,
        &partner.id,
        &referral.name,
        &referral.email,
        &referral.phone,
    )
    .await
    .context("Failed to create referral")?;

    deliver_serialized_json(&created, StatusCode::CREATED)
}
