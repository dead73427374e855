use std::path::Path;
use std::time::Duration;

use bastion_core::{Attempt, AttemptStore, AttemptStoreError, expiry_cutoff};
use chrono::Utc;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Row, Sqlite, SqliteConnection};

const TABLE_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Attempt records in one SQLite table.
///
/// The table is created on demand by every operation, so a table dropped
/// while the process runs is transparently recreated.
#[derive(Debug, Clone)]
pub struct SqliteAttemptStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteAttemptStore {
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self, AttemptStoreError> {
        let table = table.into();
        let pattern = Regex::new(TABLE_NAME_PATTERN)
            .map_err(|e| AttemptStoreError::InvalidTable(e.to_string()))?;
        if !pattern.is_match(&table) {
            return Err(AttemptStoreError::InvalidTable(table));
        }
        Ok(Self { pool, table })
    }

    /// Lazily opens the database file at `path`, creating it when missing.
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, AttemptStoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_lazy_with(options);
        Self::new(pool, table)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn ensure_table<'e, E>(&self, executor: E) -> Result<(), AttemptStoreError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (hash TEXT NOT NULL UNIQUE, date INTEGER NOT NULL, data TEXT DEFAULT NULL)",
            self.table
        );
        sqlx::query(&sql).execute(executor).await.map_err(db_error)?;
        Ok(())
    }

    async fn fetch<'e, E>(&self, executor: E, hash: &str) -> Result<Option<Attempt>, AttemptStoreError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT data FROM {} WHERE hash = ?", self.table);
        let row = sqlx::query(&sql)
            .bind(hash)
            .fetch_optional(executor)
            .await
            .map_err(db_error)?;
        row.as_ref().map(decode).transpose()
    }

    async fn upsert<'e, E>(&self, executor: E, attempt: &Attempt) -> Result<(), AttemptStoreError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let data = serde_json::to_string(attempt)
            .map_err(|e| AttemptStoreError::CorruptRecord(e.to_string()))?;
        let sql = format!(
            "INSERT INTO {} (hash, date, data) VALUES (?, ?, ?) \
             ON CONFLICT(hash) DO UPDATE SET date = excluded.date, data = excluded.data",
            self.table
        );
        sqlx::query(&sql)
            .bind(attempt.hash())
            .bind(attempt.timestamp().timestamp())
            .bind(data)
            .execute(executor)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn increment_in(
        &self,
        conn: &mut SqliteConnection,
        hash: &str,
    ) -> Result<Attempt, AttemptStoreError> {
        let attempt = match self.fetch(&mut *conn, hash).await? {
            Some(existing) => existing.next(),
            None => Attempt::first(hash),
        };
        self.upsert(&mut *conn, &attempt).await?;
        Ok(attempt)
    }
}

fn db_error(e: sqlx::Error) -> AttemptStoreError {
    AttemptStoreError::DatabaseError(e.to_string())
}

fn decode(row: &SqliteRow) -> Result<Attempt, AttemptStoreError> {
    let data: Option<String> = row.try_get("data").map_err(db_error)?;
    let data = data.ok_or_else(|| AttemptStoreError::CorruptRecord("empty data column".to_string()))?;
    serde_json::from_str(&data).map_err(|e| AttemptStoreError::CorruptRecord(e.to_string()))
}

#[async_trait::async_trait]
impl AttemptStore for SqliteAttemptStore {
    #[tracing::instrument(name = "SqliteAttemptStore::get", skip_all, fields(table = %self.table))]
    async fn get(&self, hash: &str) -> Result<Option<Attempt>, AttemptStoreError> {
        self.ensure_table(&self.pool).await?;
        self.fetch(&self.pool, hash).await
    }

    #[tracing::instrument(name = "SqliteAttemptStore::set", skip_all, fields(table = %self.table))]
    async fn set(&self, attempt: &Attempt) -> Result<(), AttemptStoreError> {
        self.ensure_table(&self.pool).await?;
        self.upsert(&self.pool, attempt).await
    }

    #[tracing::instrument(name = "SqliteAttemptStore::clear_expired", skip_all, fields(table = %self.table))]
    async fn clear_expired(&self, max_age: Duration) -> Result<(), AttemptStoreError> {
        self.ensure_table(&self.pool).await?;
        let cutoff = expiry_cutoff(Utc::now(), max_age).timestamp();
        let sql = format!("DELETE FROM {} WHERE date <= ?", self.table);
        let result = sqlx::query(&sql)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        tracing::debug!(removed = result.rows_affected(), "Swept expired attempts");
        Ok(())
    }

    #[tracing::instrument(name = "SqliteAttemptStore::clear", skip_all, fields(table = %self.table))]
    async fn clear(&self, hash: &str) -> Result<(), AttemptStoreError> {
        self.ensure_table(&self.pool).await?;
        let sql = format!("DELETE FROM {} WHERE hash = ?", self.table);
        sqlx::query(&sql)
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    #[tracing::instrument(name = "SqliteAttemptStore::increment", skip_all, fields(table = %self.table))]
    async fn increment(&self, hash: &str) -> Result<Attempt, AttemptStoreError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        self.ensure_table(&mut *conn).await?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;

        let result = self.increment_in(&mut conn, hash).await;
        let finished = finish_transaction(conn, result.is_ok()).await;
        let attempt = result?;
        finished?;
        Ok(attempt)
    }
}

// Ends the transaction opened on `conn`. A connection whose transaction can
// not be closed is detached so it never returns to the pool mid-transaction.
async fn finish_transaction(
    mut conn: PoolConnection<Sqlite>,
    commit: bool,
) -> Result<(), AttemptStoreError> {
    if commit {
        match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to commit attempt transaction");
                if sqlx::query("ROLLBACK").execute(&mut *conn).await.is_err() {
                    drop(conn.detach());
                }
                return Err(db_error(e));
            }
        }
    }

    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        tracing::warn!(error = %e, "Failed to roll back attempt transaction");
        drop(conn.detach());
    }
    Ok(())
}
