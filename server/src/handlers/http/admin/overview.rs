use anyhow::{Context, Result};
use hyper::StatusCode;
use tracing::debug;

use crate::database::{affiliates, enrollments, transactions};
use crate::handlers::http::utils::deliver_serialized_json;
use crate::{AppState, HttpResponse};

/// `GET /api/admin/partners`: affiliates with enrollment and payout totals.
pub async fn handle_list_partners(state: AppState) -> Result<HttpResponse> {
    let partners = affiliates::list_partner_overviews(&state.db)
        .await
        .context("Failed to list partners")?;
    debug!("Listing {} partners", partners.len());
    deliver_serialized_json(&partners, StatusCode::OK)
}

/// `GET /api/admin/enrollments`
pub async fn handle_list_enrollments(state: AppState) -> Result<HttpResponse> {
    let rows = enrollments::list_overviews(&state.db)
        .await
        .context("Failed to list enrollments")?;
    debug!("Listing {} enrollments", rows.len());
    deliver_serialized_json(&rows, StatusCode::OK)
}

/// `GET /api/admin/transactions`
pub async fn handle_list_transactions(state: AppState) -> Result<HttpResponse> {
    let rows = transactions::list_overviews(&state.db)
        .await
        .context("Failed to list transactions")?;
    debug!("Listing {} transactions", rows.len());
    deliver_serialized_json(&rows, StatusCode::OK)
}
