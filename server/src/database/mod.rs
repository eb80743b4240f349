//! sqlx-SQLite persistence.
//!
//! Queries are plain runtime strings; each module owns one table and maps
//! its rows into wire types from `shared` where the API needs them.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

pub mod admins;
pub mod affiliates;
pub mod enrollments;
pub mod referrals;
pub mod schema;
pub mod transactions;
pub mod utils;

pub use schema::create_tables;

/// Open a pool for `database_url`, creating the file if needed.
///
/// In-memory databases live only as long as their connection, so they get
/// a single connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    info!("Database connected: {}", database_url);
    Ok(pool)
}

/// Connect and make sure the schema exists.
pub async fn open(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let pool = connect(database_url).await?;
    create_tables(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    open("sqlite::memory:").await.unwrap()
}
