// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use roster_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create SQLite connection pool with WAL mode and foreign keys.
///
/// Accepts `sqlite:` URLs, `:memory:`, or a plain file path.
/// In-memory databases live on exactly one connection, so every handle sees the same data.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = is_in_memory(database_url);

    let options = if database_url.starts_with("sqlite:") || database_url == ":memory:" {
        SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Config(format!("Invalid database URL {}: {}", database_url, e)))?
    } else {
        SqliteConnectOptions::new().filename(database_url)
    };

    let options = options
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true)
        .create_if_missing(true);

    let (options, pool_options) = if in_memory {
        (
            options,
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        )
    } else {
        (
            options.journal_mode(SqliteJournalMode::Wal),
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS),
        )
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
