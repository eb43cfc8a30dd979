//! SQLite storage handle for the bookstore service.
//!
//! The [`Database`] is constructed once at startup and handed to every module
//! that needs storage. Handlers acquire a pooled connection or a transaction
//! per request; a transaction dropped without `commit` rolls back.

use std::str::FromStr;
use std::time::Duration;

use bookstore_kernel::settings::DatabaseSettings;
use bookstore_kernel::Migration;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{ConnectOptions, Sqlite, Transaction};
use thiserror::Error;

/// Errors raised while opening or migrating the store
#[derive(Error, Debug)]
pub enum DbError {
    #[error("invalid database url '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to connect to database")]
    Connect(#[source] sqlx::Error),

    #[error("migration {module}/{id} failed")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Cloneable handle over the connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database described by `settings`
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str(&settings.url)
            .map_err(|source| DbError::InvalidUrl {
                url: settings.url.clone(),
                source,
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms))
            .connect_with(connect_opts)
            .await
            .map_err(DbError::Connect)?;

        tracing::info!(
            url = %settings.url,
            max_connections = settings.max_connections,
            "database pool opened"
        );

        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests.
    ///
    /// Pinned to a single connection that never expires, since every SQLite
    /// in-memory connection is its own database.
    pub async fn connect_in_memory() -> Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await
            .map_err(DbError::Connect)?;

        Ok(Self { pool })
    }

    /// Apply every migration not yet recorded in `_migrations`.
    ///
    /// Each migration runs in its own transaction together with its
    /// bookkeeping row. Returns the number of migrations applied.
    pub async fn migrate(&self, migrations: &[(String, Migration)]) -> Result<usize> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                module TEXT NOT NULL,
                id TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (module, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let wrap = |source| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            };

            let mut tx = self.pool.begin().await?;

            let already: Option<String> =
                sqlx::query_scalar("SELECT id FROM _migrations WHERE module = ? AND id = ?")
                    .bind(module)
                    .bind(migration.id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if already.is_some() {
                continue;
            }

            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .map_err(wrap)?;
            sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
                .bind(module)
                .bind(migration.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await.map_err(wrap)?;

            tracing::info!(module = %module, migration = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }

    /// Begin a request-scoped write transaction.
    ///
    /// Takes the write lock up front (`BEGIN IMMEDIATE`). A deferred
    /// transaction that reads before writing fails with `SQLITE_BUSY_SNAPSHOT`
    /// when another writer commits in between, and the busy timeout does not
    /// retry that case.
    pub async fn begin(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        self.pool.begin_with("BEGIN IMMEDIATE").await
    }

    /// Begin a read-only transaction so several queries share one snapshot
    pub async fn begin_read(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await
    }

    /// Acquire a request-scoped connection for reads
    pub async fn acquire(&self) -> sqlx::Result<PoolConnection<Sqlite>> {
        self.pool.acquire().await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<(String, Migration)> {
        vec![
            (
                "parents".to_string(),
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE parents (id INTEGER PRIMARY KEY);",
                },
            ),
            (
                "children".to_string(),
                Migration {
                    id: "001_init",
                    up: r#"
                        CREATE TABLE children (
                            id INTEGER PRIMARY KEY,
                            parent_id INTEGER NOT NULL REFERENCES parents(id)
                        );
                        CREATE INDEX idx_children_parent ON children(parent_id);
                    "#,
                },
            ),
        ]
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let db = Database::connect_in_memory().await.unwrap();

        assert_eq!(db.migrate(&schema()).await.unwrap(), 2);
        assert_eq!(db.migrate(&schema()).await.unwrap(), 0);

        let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(recorded, 2);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let db = Database::connect_in_memory().await.unwrap();
        let broken = vec![(
            "broken".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE nope (",
            },
        )];

        let err = db.migrate(&broken).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { ref module, .. } if module == "broken"));

        let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(recorded, 0);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate(&schema()).await.unwrap();

        let err = sqlx::query("INSERT INTO children (id, parent_id) VALUES (1, 42)")
            .execute(db.pool())
            .await
            .unwrap_err();
        let is_fk = err
            .as_database_error()
            .map(|e| e.is_foreign_key_violation())
            .unwrap_or(false);
        assert!(is_fk, "expected foreign key violation, got {err}");
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate(&schema()).await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            sqlx::query("INSERT INTO parents (id) VALUES (1)")
                .execute(&mut *tx)
                .await
                .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parents")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn read_then_write_survives_concurrent_commit() {
        let dir = tempfile::tempdir().unwrap();
        let settings = DatabaseSettings {
            url: format!("sqlite://{}", dir.path().join("bookstore.db").display()),
            max_connections: 4,
            acquire_timeout_ms: 5000,
        };
        let db = Database::connect(&settings).await.unwrap();
        db.migrate(&schema()).await.unwrap();
        sqlx::query("INSERT INTO parents (id) VALUES (1)")
            .execute(db.pool())
            .await
            .unwrap();

        let mut tx = db.begin().await.unwrap();
        let parent: Option<i64> = sqlx::query_scalar("SELECT id FROM parents WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await
            .unwrap();
        assert_eq!(parent, Some(1));

        let other = db.clone();
        let concurrent = tokio::spawn(async move {
            let mut tx = other.begin().await?;
            sqlx::query("INSERT INTO parents (id) VALUES (2)")
                .execute(&mut *tx)
                .await?;
            tx.commit().await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        sqlx::query("INSERT INTO children (id, parent_id) VALUES (1, 1)")
            .execute(&mut *tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        concurrent.await.unwrap().unwrap();

        let parents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parents")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM children")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!((parents, children), (2, 1));
        db.close().await;
    }
}
