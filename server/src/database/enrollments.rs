use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use shared::types::{EnrollmentOverview, PendingPayout, RecentActivity};

use crate::database::utils::{generate_id, get_timestamp};

/// Enrollment row as partners see it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: String,
    pub partner_id: String,
    pub name: String,
    pub email: String,
    pub course: String,
    pub joined: i64,
    pub package: String,
    pub plan: String,
    pub commission_rate: f64,
    pub paid_amount: f64,
    pub commission: f64,
    pub payout_status: String,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub partner_id: String,
    pub name: String,
    pub email: String,
    pub course: String,
    pub package: String,
    /// `Monthly` or `Annual`
    pub plan: String,
    pub commission_rate: f64,
    pub paid_amount: f64,
    pub commission: f64,
}

#[derive(Debug, FromRow)]
struct EnrollmentOverviewRow {
    id: String,
    affiliate_name: Option<String>,
    partner_id: String,
    name: String,
    course: String,
    package: String,
    plan: String,
    paid_amount: f64,
    commission_rate: f64,
    commission: f64,
    payout_status: String,
    joined: i64,
}

impl From<EnrollmentOverviewRow> for EnrollmentOverview {
    fn from(row: EnrollmentOverviewRow) -> Self {
        Self {
            id: row.id,
            affiliate_name: row.affiliate_name.unwrap_or_else(|| "Unknown".to_string()),
            affiliate_id: row.partner_id,
            student_name: row.name,
            course: row.course,
            package: row.package,
            plan: row.plan,
            amount_paid: row.paid_amount,
            commission_rate: row.commission_rate,
            payout_amount: row.commission,
            net_revenue: row.paid_amount - row.commission,
            is_paid_to_affiliate: row.payout_status == "Paid",
            enrollment_date: row.joined,
        }
    }
}

#[derive(Debug, FromRow)]
struct PendingPayoutRow {
    affiliate_id: String,
    name: String,
    email: String,
    phone: String,
    enrollments_count: i64,
    total_payable: f64,
    date: i64,
}

const ENROLLMENT_COLUMNS: &str = "id, partner_id, name, email, course, joined, package, plan, \
     commission_rate, paid_amount, commission, payout_status";

pub async fn create_enrollment(
    pool: &SqlitePool,
    new: NewEnrollment,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (id, partner_id, name, email, course, joined, package, plan,
                                  commission_rate, paid_amount, commission, payout_status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'Pending')
         RETURNING {}",
        ENROLLMENT_COLUMNS
    ))
    .bind(generate_id())
    .bind(&new.partner_id)
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.course)
    .bind(get_timestamp())
    .bind(&new.package)
    .bind(&new.plan)
    .bind(new.commission_rate)
    .bind(new.paid_amount)
    .bind(new.commission)
    .fetch_one(pool)
    .await
}

/// A partner's enrollments, newest first.
pub async fn list_for_partner(
    pool: &SqlitePool,
    partner_id: &str,
) -> Result<Vec<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "SELECT {} FROM enrollments WHERE partner_id = ? ORDER BY joined DESC, rowid DESC",
        ENROLLMENT_COLUMNS
    ))
    .bind(partner_id)
    .fetch_all(pool)
    .await
}

/// Every enrollment with its affiliate's name, newest first.
pub async fn list_overviews(pool: &SqlitePool) -> Result<Vec<EnrollmentOverview>, sqlx::Error> {
    let rows = sqlx::query_as::<_, EnrollmentOverviewRow>(
        "SELECT e.id, a.name AS affiliate_name, e.partner_id, e.name, e.course, e.package,
                e.plan, e.paid_amount, e.commission_rate, e.commission, e.payout_status, e.joined
         FROM enrollments e
         LEFT JOIN affiliates a ON a.id = e.partner_id
         ORDER BY e.joined DESC, e.rowid DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(EnrollmentOverview::from).collect())
}

/// `(enrollment count, total paid)` across all enrollments.
pub async fn totals(pool: &SqlitePool) -> Result<(i64, f64), sqlx::Error> {
    sqlx::query_as::<_, (i64, f64)>(
        "SELECT COUNT(*), CAST(COALESCE(SUM(paid_amount), 0) AS REAL) FROM enrollments",
    )
    .fetch_one(pool)
    .await
}

/// The `limit` most recent enrollments as dashboard activity.
pub async fn recent_activity(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<RecentActivity>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, String, i64, f64)>(
        "SELECT id, name, package, joined, paid_amount
         FROM enrollments
         ORDER BY joined DESC, rowid DESC
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, user, package, date, amount)| RecentActivity {
            id,
            user,
            action: format!("enrolled in {}", package),
            date,
            amount,
        })
        .collect())
}

/// Commission not yet paid out to `partner_id`.
pub async fn pending_commission(pool: &SqlitePool, partner_id: &str) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT CAST(COALESCE(SUM(commission), 0) AS REAL)
         FROM enrollments
         WHERE partner_id = ? AND payout_status = 'Pending'",
    )
    .bind(partner_id)
    .fetch_one(pool)
    .await
}

/// Pending commission grouped per affiliate.
pub async fn pending_payouts(pool: &SqlitePool) -> Result<Vec<PendingPayout>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PendingPayoutRow>(
        "SELECT a.id AS affiliate_id, a.name, a.email, a.phone,
                COUNT(e.id) AS enrollments_count,
                CAST(SUM(e.commission) AS REAL) AS total_payable,
                MIN(e.joined) AS date
         FROM enrollments e
         JOIN affiliates a ON a.id = e.partner_id
         WHERE e.payout_status = 'Pending'
         GROUP BY a.id
         ORDER BY date ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| PendingPayout {
            affiliate_id: row.affiliate_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            enrollments_count: row.enrollments_count,
            total_payable: row.total_payable,
            status: "pending".to_string(),
            date: row.date,
        })
        .collect())
}

#[cfg(test)]
impl NewEnrollment {
    pub fn sample(partner_id: &str, commission: f64) -> Self {
        Self {
            partner_id: partner_id.to_string(),
            name: "Student".into(),
            email: "student@example.com".into(),
            course: "Data Science".into(),
            package: "Pro".into(),
            plan: "Monthly".into(),
            commission_rate: 10.0,
            paid_amount: commission * 10.0,
            commission,
        }
    }
}
