use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GET /api/admin/stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_partners: i64,
    pub total_revenue: f64,
    pub active_students: i64,
    pub recent_activity: Vec<RecentActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentActivity {
    pub id: String,
    pub user: String,
    pub action: String,
    pub date: i64,
    pub amount: f64,
}

// ---------------------------------------------------------------------------
// GET /api/admin/partners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerOverview {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    pub status: String,
    pub enrollments: i64,
    /// Commission on enrollments not yet paid out.
    pub payout_balance: f64,
    pub total_paid: f64,
    pub accepted_terms: bool,
    pub joined: i64,
}

// ---------------------------------------------------------------------------
// GET /api/admin/enrollments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentOverview {
    pub id: String,
    pub affiliate_name: String,
    pub affiliate_id: String,
    pub student_name: String,
    pub course: String,
    pub package: String,
    pub plan: String,
    pub amount_paid: f64,
    pub commission_rate: f64,
    pub payout_amount: f64,
    pub net_revenue: f64,
    pub is_paid_to_affiliate: bool,
    pub enrollment_date: i64,
}

// ---------------------------------------------------------------------------
// GET /api/admin/transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOverview {
    pub id: String,
    pub date: i64,
    pub affiliate_name: String,
    pub email: String,
    pub amount: f64,
    pub payment_mode: String,
    pub enrollments_count: i64,
    pub proof_url: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// GET / POST /api/admin/payouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayout {
    pub affiliate_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub enrollments_count: i64,
    pub total_payable: f64,
    pub status: String,
    /// Join date of the oldest pending enrollment.
    pub date: i64,
}

/// A JSON number, or the text of a form input holding one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Unix seconds, or a date string (`YYYY-MM-DD` or RFC 3339).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PayoutDate {
    Unix(i64),
    Text(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    #[serde(default)]
    pub affiliate_id: String,
    #[serde(default)]
    pub amount: Option<NumberOrText>,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Defaults to now.
    #[serde(default)]
    pub date: Option<PayoutDate>,
    #[serde(default)]
    pub proof_url: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /api/admin/invite
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}
