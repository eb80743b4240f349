use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use shared::types::TransactionOverview;

use crate::database::utils::{generate_id, get_timestamp};

pub const DEFAULT_PAYMENT_METHOD: &str = "Bank Transfer";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Payout transaction row.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub partner_id: String,
    pub transaction_date: i64,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub transaction_id: String,
    pub status: String,
    pub payment_proof_url: Option<String>,
    #[sqlx(skip)]
    pub enrollment_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewPayout {
    pub partner_id: String,
    pub amount: f64,
    pub transaction_id: String,
    pub payment_method: Option<String>,
    pub date: Option<i64>,
    pub proof_url: Option<String>,
}

#[derive(Debug, FromRow)]
struct TransactionOverviewRow {
    id: String,
    transaction_date: i64,
    affiliate_name: Option<String>,
    affiliate_email: Option<String>,
    amount: f64,
    payment_method: String,
    enrollments_count: i64,
    payment_proof_url: Option<String>,
    status: String,
}

impl From<TransactionOverviewRow> for TransactionOverview {
    fn from(row: TransactionOverviewRow) -> Self {
        Self {
            id: row.id,
            date: row.transaction_date,
            affiliate_name: row.affiliate_name.unwrap_or_else(|| "Unknown".to_string()),
            email: row.affiliate_email.unwrap_or_default(),
            amount: row.amount,
            payment_mode: row.payment_method,
            enrollments_count: row.enrollments_count,
            proof_url: row
                .payment_proof_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "#".to_string()),
            status: if row.status == "Completed" {
                "Success".to_string()
            } else {
                row.status
            },
        }
    }
}

const TRANSACTION_COLUMNS: &str = "id, partner_id, transaction_date, amount, currency, \
     payment_method, transaction_id, status, payment_proof_url";

/// Outcome of [`record_payout`].
#[derive(Debug)]
pub enum PayoutOutcome {
    Recorded(Transaction),
    NothingPending,
}

/// Pay out every pending enrollment of a partner.
///
/// Creates a `Completed` transaction linked to those enrollments and marks
/// them `Paid`, all inside one database transaction.
pub async fn record_payout(
    pool: &SqlitePool,
    payout: NewPayout,
) -> Result<PayoutOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let pending: Vec<String> = sqlx::query_scalar(
        "SELECT id FROM enrollments
         WHERE partner_id = ? AND payout_status = 'Pending'
         ORDER BY joined ASC, rowid ASC",
    )
    .bind(&payout.partner_id)
    .fetch_all(&mut *tx)
    .await?;

    if pending.is_empty() {
        tx.rollback().await?;
        return Ok(PayoutOutcome::NothingPending);
    }

    let mut transaction = sqlx::query_as::<_, Transaction>(&format!(
        "INSERT INTO transactions (id, partner_id, transaction_date, amount, currency,
                                   payment_method, transaction_id, status, payment_proof_url)
         VALUES (?, ?, ?, ?, ?, ?, ?, 'Completed', ?)
         RETURNING {}",
        TRANSACTION_COLUMNS
    ))
    .bind(generate_id())
    .bind(&payout.partner_id)
    .bind(payout.date.unwrap_or_else(get_timestamp))
    .bind(payout.amount)
    .bind(DEFAULT_CURRENCY)
    .bind(
        payout
            .payment_method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD),
    )
    .bind(&payout.transaction_id)
    .bind(&payout.proof_url)
    .fetch_one(&mut *tx)
    .await?;

    for enrollment_id in &pending {
        sqlx::query(
            "INSERT INTO transaction_enrollments (transaction_id, enrollment_id) VALUES (?, ?)",
        )
        .bind(&transaction.id)
        .bind(enrollment_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE enrollments SET payout_status = 'Paid' WHERE id = ?")
            .bind(enrollment_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(
        "Recorded payout {} of {:.2} to partner {} covering {} enrollment(s)",
        transaction.transaction_id,
        transaction.amount,
        transaction.partner_id,
        pending.len()
    );

    transaction.enrollment_ids = pending;
    Ok(PayoutOutcome::Recorded(transaction))
}

/// A partner's transactions, newest first.
pub async fn list_for_partner(
    pool: &SqlitePool,
    partner_id: &str,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let mut transactions = sqlx::query_as::<_, Transaction>(&format!(
        "SELECT {} FROM transactions WHERE partner_id = ?
         ORDER BY transaction_date DESC, rowid DESC",
        TRANSACTION_COLUMNS
    ))
    .bind(partner_id)
    .fetch_all(pool)
    .await?;

    for transaction in &mut transactions {
        transaction.enrollment_ids = sqlx::query_scalar(
            "SELECT enrollment_id FROM transaction_enrollments WHERE transaction_id = ?",
        )
        .bind(&transaction.id)
        .fetch_all(pool)
        .await?;
    }

    Ok(transactions)
}

/// Sum of completed payouts to `partner_id`.
pub async fn total_received(pool: &SqlitePool, partner_id: &str) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT CAST(COALESCE(SUM(amount), 0) AS REAL)
         FROM transactions
         WHERE partner_id = ? AND status = 'Completed'",
    )
    .bind(partner_id)
    .fetch_one(pool)
    .await
}

/// Every transaction with affiliate details, newest first.
pub async fn list_overviews(pool: &SqlitePool) -> Result<Vec<TransactionOverview>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionOverviewRow>(
        "SELECT t.id, t.transaction_date, a.name AS affiliate_name, a.email AS affiliate_email,
                t.amount, t.payment_method, t.payment_proof_url, t.status,
                (SELECT COUNT(*) FROM transaction_enrollments te WHERE te.transaction_id = t.id)
                    AS enrollments_count
         FROM transactions t
         LEFT JOIN affiliates a ON a.id = t.partner_id
         ORDER BY t.transaction_date DESC, t.rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(TransactionOverview::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::affiliates::{NewAffiliate, create_affiliate};
    use crate::database::enrollments::{self, NewEnrollment, create_enrollment};
    use crate::database::test_pool;

    async fn partner(pool: &SqlitePool) -> String {
        create_affiliate(
            pool,
            NewAffiliate {
                name: "Mia".into(),
                email: "mia@example.com".into(),
                phone: "2".into(),
                password_hash: "h".into(),
                referral_code: "MIA0001".into(),
            },
        )
        .await
        .unwrap()
        .id
    }

    fn payout(partner_id: &str, amount: f64) -> NewPayout {
        NewPayout {
            partner_id: partner_id.to_string(),
            amount,
            transaction_id: "TX-1".into(),
            payment_method: None,
            date: Some(1_700_000_000),
            proof_url: None,
        }
    }

    #[tokio::test]
    async fn payout_marks_pending_enrollments_paid() {
        let pool = test_pool().await;
        let pid = partner(&pool).await;
        create_enrollment(&pool, NewEnrollment::sample(&pid, 4.0)).await.unwrap();
        create_enrollment(&pool, NewEnrollment::sample(&pid, 6.0)).await.unwrap();

        let outcome = record_payout(&pool, payout(&pid, 10.0)).await.unwrap();
        let tx = match outcome {
            PayoutOutcome::Recorded(tx) => tx,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(tx.status, "Completed");
        assert_eq!(tx.payment_method, DEFAULT_PAYMENT_METHOD);
        assert_eq!(tx.currency, "USD");
        assert_eq!(tx.enrollment_ids.len(), 2);

        assert_eq!(enrollments::pending_commission(&pool, &pid).await.unwrap(), 0.0);
        assert_eq!(total_received(&pool, &pid).await.unwrap(), 10.0);

        let listed = list_for_partner(&pool, &pid).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].enrollment_ids.len(), 2);
    }

    #[tokio::test]
    async fn second_payout_finds_nothing_pending() {
        let pool = test_pool().await;
        let pid = partner(&pool).await;
        create_enrollment(&pool, NewEnrollment::sample(&pid, 4.0)).await.unwrap();

        record_payout(&pool, payout(&pid, 4.0)).await.unwrap();
        assert!(matches!(
            record_payout(&pool, payout(&pid, 4.0)).await.unwrap(),
            PayoutOutcome::NothingPending
        ));
    }

    #[tokio::test]
    async fn overview_reports_success_and_placeholder_proof() {
        let pool = test_pool().await;
        let pid = partner(&pool).await;
        create_enrollment(&pool, NewEnrollment::sample(&pid, 3.0)).await.unwrap();
        record_payout(&pool, payout(&pid, 3.0)).await.unwrap();

        let rows = list_overviews(&pool).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "Success");
        assert_eq!(rows[0].proof_url, "#");
        assert_eq!(rows[0].affiliate_name, "Mia");
        assert_eq!(rows[0].email, "mia@example.com");
        assert_eq!(rows[0].enrollments_count, 1);
        assert_eq!(rows[0].date, 1_700_000_000);
    }
}
