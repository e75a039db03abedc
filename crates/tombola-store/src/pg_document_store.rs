//! `PostgreSQL` implementation of the `DocumentStore` trait.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tombola_core::error::DomainError;
use tombola_core::store::{DocumentPath, DocumentStore, Snapshot, Write};

/// PostgreSQL-backed document store.
///
/// Documents live in a single `documents` table keyed by path, with a
/// per-row version that increments on every mutation. Deletes null out
/// the payload but keep the row as a tombstone. Commits that read a
/// document as missing claim a version-0 row for it, which readers treat
/// the same as no row at all.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_error(err: sqlx::Error) -> DomainError {
    DomainError::StoreUnavailable(err.to_string())
}

const UPSERT: &str = "INSERT INTO documents (path, data, version) VALUES ($1, $2, 1) \
     ON CONFLICT (path) DO UPDATE SET data = EXCLUDED.data, version = documents.version + 1";

// Claims a version-0 row for a document read as missing. Indistinguishable
// from an absent document to readers (no payload, version 0), but it gives
// the missing-document check below a row to lock.
const CLAIM_MISSING: &str = "INSERT INTO documents (path, data, version) VALUES ($1, NULL, 0) \
     ON CONFLICT (path) DO NOTHING";

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Snapshot, DomainError> {
        let row = sqlx::query("SELECT data, version FROM documents WHERE path = $1")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(match row {
            Some(row) => Snapshot {
                path: path.clone(),
                version: row.get::<i64, _>("version"),
                data: row.get::<Option<serde_json::Value>, _>("data"),
            },
            None => Snapshot {
                path: path.clone(),
                version: 0,
                data: None,
            },
        })
    }

    async fn commit(
        &self,
        reads: &[(DocumentPath, i64)],
        writes: &[Write],
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        for (path, expected) in reads {
            // Under READ COMMITTED, `SELECT ... FOR UPDATE` on an absent
            // row neither sees nor blocks a concurrent insert of that
            // row, so a document read as missing could be created and
            // committed underneath us without the version check firing.
            // Claiming the row first serializes on the primary key: this
            // insert waits out any in-flight creation, and the re-read
            // below then observes its committed version.
            if *expected == 0 {
                sqlx::query(CLAIM_MISSING)
                    .bind(path.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(store_error)?;
            }
            let row = sqlx::query("SELECT version FROM documents WHERE path = $1 FOR UPDATE")
                .bind(path.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_error)?;
            let actual = row.map_or(0, |row| row.get::<i64, _>("version"));
            if actual != *expected {
                tracing::debug!(path = %path, expected, actual, "commit rejected, stale read");
                // Dropping `tx` rolls the transaction back.
                return Err(DomainError::Conflict {
                    path: path.to_string(),
                    expected: *expected,
                    actual,
                });
            }
        }

        for write in writes {
            let (path, data) = match write {
                Write::Set { path, data } => (path, Some(data)),
                Write::Delete { path } => (path, None),
            };
            sqlx::query(UPSERT)
                .bind(path.as_str())
                .bind(data)
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)
    }

    async fn put(&self, path: &DocumentPath, data: serde_json::Value) -> Result<(), DomainError> {
        sqlx::query(UPSERT)
            .bind(path.as_str())
            .bind(Some(data))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), DomainError> {
        sqlx::query(UPSERT)
            .bind(path.as_str())
            .bind(None::<serde_json::Value>)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn list(
        &self,
        parent: &DocumentPath,
        collection: &str,
    ) -> Result<Vec<Snapshot>, DomainError> {
        let prefix = format!("{parent}/{collection}/");
        let rows = sqlx::query(
            "SELECT path, data, version FROM documents \
             WHERE starts_with(path, $1) AND data IS NOT NULL ORDER BY path",
        )
        .bind(&prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let path: String = row.get("path");
                // Direct children only, not nested sub-collections.
                path.strip_prefix(&prefix)
                    .filter(|rest| !rest.contains('/'))
                    .map(|doc_id| Snapshot {
                        path: DocumentPath::new(&prefix[..prefix.len() - 1], doc_id),
                        version: row.get::<i64, _>("version"),
                        data: row.get::<Option<serde_json::Value>, _>("data"),
                    })
            })
            .collect())
    }
}
