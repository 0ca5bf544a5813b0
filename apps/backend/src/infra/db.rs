//! Database bootstrap: connect with retries, then bring the schema up.

use std::future::Future;
use std::time::Duration;

use migration::MigrationCommand;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{info, warn};

use crate::error::AppError;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_INTERVAL_MS: u64 = 500;

/// Retry `connect_fn` with a fixed delay; the last error is returned.
async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    loop {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(attempt, interval_ms, "connection_retry=success");
                }
                return Ok(result);
            }
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                warn!(attempt, max_attempts, interval_ms, error = %e, "connection_retry=failed");
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Strip the password from a connection URL for logging.
pub fn sanitize_db_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &url[scheme_end + 3..at];
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{}{user}:***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn connect_options(database_url: &str) -> ConnectOptions {
    let mut opts = ConnectOptions::new(database_url.to_string());
    opts.connect_timeout(Duration::from_secs(5)).sqlx_logging(false);
    // SQLite keeps the single-connection default so `:memory:` stays one database.
    if !database_url.starts_with("sqlite:") {
        opts.max_connections(10);
    }
    opts
}

/// Open the pool. Does not run migrations.
pub async fn connect_db(database_url: &str) -> Result<DatabaseConnection, AppError> {
    let conn = retry_connection(
        || {
            let opts = connect_options(database_url);
            async move { Database::connect(opts).await.map_err(AppError::from) }
        },
        CONNECT_ATTEMPTS,
        CONNECT_INTERVAL_MS,
    )
    .await?;
    info!(url = %sanitize_db_url(database_url), "database connected");
    Ok(conn)
}

/// Connect and apply pending migrations.
pub async fn bootstrap_db(database_url: &str) -> Result<DatabaseConnection, AppError> {
    let conn = connect_db(database_url).await?;
    migration::migrate(&conn, MigrationCommand::Up).await?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_sanitize_hides_password() {
        assert_eq!(
            sanitize_db_url("postgres://app:secret@db:5432/wardrobe"),
            "postgres://app:***@db:5432/wardrobe"
        );
        assert_eq!(sanitize_db_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let calls = AtomicU32::new(0);
        let res: Result<(), AppError> = retry_connection(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::config("down")) }
            },
            3,
            1,
        )
        .await;
        assert_eq!(res.unwrap_err().code(), ErrorCode::ConfigError);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bootstrap_sqlite_memory() {
        let conn = bootstrap_db("sqlite::memory:").await.unwrap();
        assert_eq!(migration::count_applied_migrations(&conn).await.unwrap(), 1);
    }
}
