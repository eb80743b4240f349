use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use hyper::StatusCode;
use serde::Serialize;
use tracing::{info, warn};

use shared::types::{NumberOrText, PayoutDate, PayoutRequest};

use crate::auth::Identity;
use crate::database::enrollments;
use crate::database::transactions::{self, NewPayout, PayoutOutcome, Transaction};
use crate::database::utils::sanitize_string;
use crate::handlers::http::utils::{deliver_error_json, deliver_serialized_json, read_json};
use crate::{AppState, HttpResponse, IncomingRequest};

/// Why a payout body was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayoutRejection {
    MissingFields,
    /// Present but unreadable, e.g. a malformed date.
    Invalid,
}

impl PayoutRejection {
    fn message(&self) -> &'static str {
        match self {
            Self::MissingFields => "Missing required fields",
            Self::Invalid => "Invalid request",
        }
    }
}

#[derive(Debug, Serialize)]
struct PayoutRecorded {
    success: bool,
    transaction: Transaction,
}

/// `GET /api/admin/payouts`: pending commission grouped per affiliate.
pub async fn handle_pending_payouts(state: AppState) -> Result<HttpResponse> {
    let payouts = enrollments::pending_payouts(&state.db)
        .await
        .context("Failed to load pending payouts")?;
    deliver_serialized_json(&payouts, StatusCode::OK)
}

/// `POST /api/admin/payouts`: pay out every pending enrollment of one
/// affiliate in a single transaction.
pub async fn handle_record_payout(
    req: IncomingRequest,
    state: AppState,
    identity: Identity,
) -> Result<HttpResponse> {
    let Some(request) = read_json::<PayoutRequest, _>(req.into_body()).await else {
        return deliver_error_json(PayoutRejection::Invalid.message(), StatusCode::BAD_REQUEST);
    };

    let payout = match to_new_payout(request) {
        Ok(payout) => payout,
        Err(rejection) => {
            warn!("Payout refused: {:?}", rejection);
            return deliver_error_json(rejection.message(), StatusCode::BAD_REQUEST);
        }
    };

    info!(
        "Admin {} recording payout {} for affiliate {}",
        identity.email, payout.transaction_id, payout.partner_id
    );

    match transactions::record_payout(&state.db, payout)
        .await
        .context("Failed to record payout")?
    {
        PayoutOutcome::Recorded(transaction) => deliver_serialized_json(
            &PayoutRecorded {
                success: true,
                transaction,
            },
            StatusCode::OK,
        ),
        PayoutOutcome::NothingPending => {
            warn!("Payout requested with nothing pending");
            deliver_error_json("No pending enrollments found", StatusCode::BAD_REQUEST)
        }
    }
}

fn to_new_payout(request: PayoutRequest) -> Result<NewPayout, PayoutRejection> {
    let partner_id = sanitize_string(&request.affiliate_id);
    let transaction_id = sanitize_string(&request.transaction_id);

    if partner_id.is_empty() || transaction_id.is_empty() {
        return Err(PayoutRejection::MissingFields);
    }

    Ok(NewPayout {
        partner_id,
        amount: parse_amount(request.amount)?,
        transaction_id,
        payment_method: request.payment_method,
        date: parse_date(request.date)?,
        proof_url: request.proof_url.filter(|u| !u.trim().is_empty()),
    })
}

/// Amount as a number or numeric text; zero, negative and non-finite
/// amounts count as missing.
fn parse_amount(amount: Option<NumberOrText>) -> Result<f64, PayoutRejection> {
    let amount = match amount {
        None => return Err(PayoutRejection::MissingFields),
        Some(NumberOrText::Number(n)) => n,
        Some(NumberOrText::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(PayoutRejection::MissingFields);
            }
            text.parse::<f64>().map_err(|_| PayoutRejection::Invalid)?
        }
    };

    if !amount.is_finite() || amount <= 0.0 {
        return Err(PayoutRejection::MissingFields);
    }
    Ok(amount)
}

/// Unix seconds for the payout date; `None` leaves it to the database
/// layer (now).  A bare date is midnight UTC.
fn parse_date(date: Option<PayoutDate>) -> Result<Option<i64>, PayoutRejection> {
    let text = match date {
        None => return Ok(None),
        Some(PayoutDate::Unix(secs)) => return Ok(Some(secs)),
        Some(PayoutDate::Text(text)) => text,
    };

    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Some(midnight.and_utc().timestamp()))
            .ok_or(PayoutRejection::Invalid);
    }

    DateTime::parse_from_rfc3339(text)
        .map(|dt| Some(dt.timestamp()))
        .map_err(|_| PayoutRejection::Invalid)
}
