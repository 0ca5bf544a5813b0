//! Throwaway SQLite database for tests.
//!
//! A file database inside a `TempDir` so that every pooled connection sees
//! the same data; the directory is removed when `TestDb` drops.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tempfile::TempDir;

pub struct TestDb {
    pub conn: DatabaseConnection,
    pub url: String,
    _dir: TempDir,
}

impl TestDb {
    /// Create, connect and migrate a fresh database.
    pub async fn new() -> Result<Self, DbErr> {
        let dir = tempfile::tempdir().map_err(|e| DbErr::Custom(format!("tempdir: {e}")))?;
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

        let mut opts = ConnectOptions::new(url.clone());
        opts.max_connections(4).sqlx_logging(false);
        let conn = Database::connect(opts).await?;

        Migrator::up(&conn, None).await?;
        tracing::debug!(url = %url, "test database ready");

        Ok(Self {
            conn,
            url,
            _dir: dir,
        })
    }
}
