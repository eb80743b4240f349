use anyhow::{Context, Result};
use hyper::StatusCode;

use crate::database::affiliates::Affiliate;
use crate::database::{enrollments, transactions};
use crate::handlers::http::utils::deliver_serialized_json;
use crate::{AppState, HttpResponse};

/// `GET /api/partner/enrollments`, newest first.
pub async fn handle_enrollments(state: AppState, partner: Affiliate) -> Result<HttpResponse> {
    let rows = enrollments::list_for_partner(&state.db, &partner.id)
        .await
        .context("Failed to list partner enrollments")?;
    deliver_serialized_json(&rows, StatusCode::OK)
}

/// `GET /api/partner/earnings`: payout transactions, newest first.
pub async fn handle_earnings(state: AppState, partner: Affiliate) -> Result<HttpResponse> {
    let rows = transactions::list_for_partner(&state.db, &partner.id)
        .await
        .context("Failed to list partner transactions")?;
    deliver_serialized_json(&rows, StatusCode::OK)
}
