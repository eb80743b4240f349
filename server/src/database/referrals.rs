use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::database::utils::{generate_id, get_timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub partner_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: String,
    pub date_added: i64,
}

const REFERRAL_COLUMNS: &str = "id, partner_id, name, email, phone, status, date_added";

/// Record a `pending` referral for `partner_id`.
pub async fn create_referral(
    pool: &SqlitePool,
    partner_id: &str,
    name: &str,
    email: &str,
    phone: &str,
) -> Result<Referral, sqlx::Error> {
    let referral = sqlx::query_as::<_, Referral>(&format!(
        "INSERT INTO referrals (id, partner_id, name, email, phone, status, date_added)
         VALUES (?, ?, ?, ?, ?, 'pending', ?)
         RETURNING {}",
        REFERRAL_COLUMNS
    ))
    .bind(generate_id())
    .bind(partner_id)
    .bind(name)
    .bind(email)
    .bind(phone)
    .bind(get_timestamp())
    .fetch_one(pool)
    .await?;

    info!("Partner {} referred {}", partner_id, referral.email);
    Ok(referral)
}

/// A partner's referrals, newest first.
pub async fn list_for_partner(
    pool: &SqlitePool,
    partner_id: &str,
) -> Result<Vec<Referral>, sqlx::Error> {
    sqlx::query_as::<_, Referral>(&format!(
        "SELECT {} FROM referrals WHERE partner_id = ? ORDER BY date_added DESC, rowid DESC",
        REFERRAL_COLUMNS
    ))
    .bind(partner_id)
    .fetch_all(pool)
    .await
}
