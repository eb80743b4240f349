use anyhow::{Context, Result};
use hyper::StatusCode;
use tracing::debug;

use shared::types::PartnerStats;

use crate::database::affiliates::Affiliate;
use crate::database::{enrollments, transactions};
use crate::handlers::http::utils::deliver_serialized_json;
use crate::{AppState, HttpResponse};

/// `GET /api/partner/stats`: received, pending and lifetime commission.
pub async fn handle_stats(state: AppState, partner: Affiliate) -> Result<HttpResponse> {
    let received = transactions::total_received(&state.db, &partner.id)
        .await
        .context("Failed to total received payouts")?;
    let pending = enrollments::pending_commission(&state.db, &partner.id)
        .await
        .context("Failed to total pending commission")?;

    debug!(
        "Stats for {}: received {:.2}, pending {:.2}",
        partner.email, received, pending
    );

    deliver_serialized_json(&PartnerStats::new(received, pending), StatusCode::OK)
}
