use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use shared::types::PartnerOverview;

use crate::database::utils::{generate_id, get_timestamp};

/// Affiliate row.  The password hash never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Affiliate {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub referral_code: String,
    pub status: String,
    pub joined: i64,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct NewAffiliate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub referral_code: String,
}

#[derive(Debug, FromRow)]
struct PartnerOverviewRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    referral_code: String,
    status: String,
    joined: i64,
    enrollments: i64,
    payout_balance: f64,
    total_paid: f64,
}

impl From<PartnerOverviewRow> for PartnerOverview {
    fn from(row: PartnerOverviewRow) -> Self {
        Self {
            accepted_terms: row.status == "Accepted",
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            referral_code: row.referral_code,
            status: row.status,
            enrollments: row.enrollments,
            payout_balance: row.payout_balance,
            total_paid: row.total_paid,
            joined: row.joined,
        }
    }
}

const AFFILIATE_COLUMNS: &str =
    "id, name, email, phone, password_hash, referral_code, status, joined, amount";

pub async fn find_affiliate_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<Affiliate>, sqlx::Error> {
    sqlx::query_as::<_, Affiliate>(&format!(
        "SELECT {} FROM affiliates WHERE email = ?",
        AFFILIATE_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM affiliates WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn referral_code_exists(pool: &SqlitePool, code: &str) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM affiliates WHERE referral_code = ?")
            .bind(code)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

/// Insert a new `Pending` affiliate and return it.
pub async fn create_affiliate(
    pool: &SqlitePool,
    new: NewAffiliate,
) -> Result<Affiliate, sqlx::Error> {
    let affiliate = sqlx::query_as::<_, Affiliate>(&format!(
        "INSERT INTO affiliates (id, name, email, phone, password_hash, referral_code, status, joined, amount)
         VALUES (?, ?, ?, ?, ?, ?, 'Pending', ?, 0)
         RETURNING {}",
        AFFILIATE_COLUMNS
    ))
    .bind(generate_id())
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.password_hash)
    .bind(&new.referral_code)
    .bind(get_timestamp())
    .fetch_one(pool)
    .await?;

    info!(
        "New affiliate: {} ({}) code {}",
        affiliate.name, affiliate.email, affiliate.referral_code
    );
    Ok(affiliate)
}

/// Whether `err` is the `UNIQUE` constraint on `affiliates.email`.
pub fn is_email_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.message().contains("affiliates.email")
        }
        _ => false,
    }
}

pub async fn count_affiliates(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM affiliates")
        .fetch_one(pool)
        .await
}

/// Every affiliate, newest first, with enrollment and commission totals.
pub async fn list_partner_overviews(
    pool: &SqlitePool,
) -> Result<Vec<PartnerOverview>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PartnerOverviewRow>(
        "SELECT a.id, a.name, a.email, a.phone, a.referral_code, a.status, a.joined,
                COUNT(e.id) AS enrollments,
                CAST(COALESCE(SUM(CASE WHEN e.payout_status = 'Pending' THEN e.commission END), 0) AS REAL)
                    AS payout_balance,
                CAST(COALESCE(SUM(CASE WHEN e.payout_status = 'Paid' THEN e.commission END), 0) AS REAL)
                    AS total_paid
         FROM affiliates a
         LEFT JOIN enrollments e ON e.partner_id = a.id
         GROUP BY a.id
         ORDER BY a.joined DESC, a.rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PartnerOverview::from).collect())
}
