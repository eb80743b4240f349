use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::database::utils::{generate_id, get_timestamp};

#[derive(Debug, Clone, FromRow)]
pub struct AdminRecord {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: i64,
}

/// Look up an admin account by email
pub async fn find_admin_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<AdminRecord>, sqlx::Error> {
    sqlx::query_as::<_, AdminRecord>(
        "SELECT id, email, password_hash, created_at FROM admins WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Create an admin, or reset the password of an existing one.
/// Returns the admin's id.
pub async fn upsert_admin(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<String, sqlx::Error> {
    let id: String = sqlx::query_scalar(
        "INSERT INTO admins (id, email, password_hash, created_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash
         RETURNING id",
    )
    .bind(generate_id())
    .bind(email)
    .bind(password_hash)
    .bind(get_timestamp())
    .fetch_one(pool)
    .await?;

    info!("Admin account ready: {}", email);
    Ok(id)
}
