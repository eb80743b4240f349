use serde::{Deserialize, Serialize};

/// Response of `GET /api/partner/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerStats {
    pub lifetime_earnings: f64,
    /// Sum of completed payout transactions.
    pub total_received: f64,
    /// Commission on enrollments still awaiting payout.
    pub total_to_be_received: f64,
}

impl PartnerStats {
    pub fn new(total_received: f64, pending_commission: f64) -> Self {
        Self {
            lifetime_earnings: total_received + pending_commission,
            total_received,
            total_to_be_received: pending_commission,
        }
    }
}

/// Body of `POST /api/partner/referrals`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReferral {
    pub name: String,
    pub email: String,
    pub phone: String,
}
