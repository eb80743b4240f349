use sqlx::SqlitePool;
use tracing::{debug, info};

/// Current schema version, stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const TABLES: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS admins (
        id            TEXT    PRIMARY KEY,
        email         TEXT    NOT NULL UNIQUE,
        password_hash TEXT    NOT NULL,
        created_at    INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS affiliates (
        id            TEXT    PRIMARY KEY,
        name          TEXT    NOT NULL,
        email         TEXT    NOT NULL UNIQUE,
        phone         TEXT    NOT NULL DEFAULT '',
        password_hash TEXT,
        referral_code TEXT    NOT NULL UNIQUE,
        status        TEXT    NOT NULL DEFAULT 'Pending'
                              CHECK (status IN ('Accepted', 'Pending')),
        joined        INTEGER NOT NULL,
        amount        REAL    NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS enrollments (
        id              TEXT    PRIMARY KEY,
        partner_id      TEXT    NOT NULL,
        name            TEXT    NOT NULL,
        email           TEXT    NOT NULL,
        course          TEXT    NOT NULL,
        joined          INTEGER NOT NULL,
        package         TEXT    NOT NULL,
        plan            TEXT    NOT NULL CHECK (plan IN ('Monthly', 'Annual')),
        commission_rate REAL    NOT NULL,
        paid_amount     REAL    NOT NULL,
        commission      REAL    NOT NULL,
        payout_status   TEXT    NOT NULL DEFAULT 'Pending'
                                CHECK (payout_status IN ('Paid', 'Pending')),
        FOREIGN KEY (partner_id) REFERENCES affiliates(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS transactions (
        id                TEXT    PRIMARY KEY,
        partner_id        TEXT    NOT NULL,
        transaction_date  INTEGER NOT NULL,
        amount            REAL    NOT NULL,
        currency          TEXT    NOT NULL DEFAULT 'USD',
        payment_method    TEXT    NOT NULL,
        transaction_id    TEXT    NOT NULL,
        status            TEXT    NOT NULL
                                  CHECK (status IN ('Completed', 'Processing', 'Failed')),
        payment_proof_url TEXT,
        FOREIGN KEY (partner_id) REFERENCES affiliates(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS transaction_enrollments (
        transaction_id TEXT NOT NULL,
        enrollment_id  TEXT NOT NULL,
        PRIMARY KEY (transaction_id, enrollment_id),
        FOREIGN KEY (transaction_id) REFERENCES transactions(id) ON DELETE CASCADE,
        FOREIGN KEY (enrollment_id)  REFERENCES enrollments(id)  ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS referrals (
        id         TEXT    PRIMARY KEY,
        partner_id TEXT    NOT NULL,
        name       TEXT    NOT NULL,
        email      TEXT    NOT NULL,
        phone      TEXT    NOT NULL,
        status     TEXT    NOT NULL DEFAULT 'pending'
                           CHECK (status IN ('pending', 'enrolled')),
        date_added INTEGER NOT NULL,
        FOREIGN KEY (partner_id) REFERENCES affiliates(id) ON DELETE CASCADE
    )",
];

const INDEXES: [&str; 4] = [
    "CREATE INDEX IF NOT EXISTS idx_enrollments_partner  ON enrollments(partner_id)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_payout   ON enrollments(payout_status)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_partner ON transactions(partner_id)",
    "CREATE INDEX IF NOT EXISTS idx_referrals_partner    ON referrals(partner_id)",
];

/// Create every table and index that does not exist yet.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    for statement in TABLES.iter().chain(INDEXES.iter()) {
        sqlx::query(statement).execute(pool).await?;
    }

    if current < SCHEMA_VERSION {
        info!(
            "Database schema at version {}; now at version {}",
            current, SCHEMA_VERSION
        );
        // PRAGMA does not take bound parameters.
        sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .execute(pool)
            .await?;
    } else {
        debug!("Database schema up to date (version {})", current);
    }

    Ok(())
}
