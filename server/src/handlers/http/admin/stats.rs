use anyhow::{Context, Result};
use hyper::StatusCode;
use tracing::info;

use shared::types::AdminStats;

use crate::database::{affiliates, enrollments};
use crate::handlers::http::utils::deliver_serialized_json;
use crate::{AppState, HttpResponse};

/// Entries shown in the dashboard activity feed.
const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// `GET /api/admin/stats`
pub async fn handle_stats(state: AppState) -> Result<HttpResponse> {
    info!("Serving admin stats");

    let total_partners = affiliates::count_affiliates(&state.db)
        .await
        .context("Failed to count affiliates")?;
    let (active_students, total_revenue) = enrollments::totals(&state.db)
        .await
        .context("Failed to total enrollments")?;
    let recent_activity = enrollments::recent_activity(&state.db, RECENT_ACTIVITY_LIMIT)
        .await
        .context("Failed to load recent activity")?;

    let stats = AdminStats {
        total_partners,
        total_revenue,
        active_students,
        recent_activity,
    };

    deliver_serialized_json(&stats, StatusCode::OK)
}
