//! PostgreSQL-backed [`DocumentStore`].
//!
//! Documents live in a single JSONB table keyed by `(entity, id)` with a
//! partial unique index on `(entity, natural_key)`; links live in their own
//! table with a unique index over both sides. Unique violations (SQLSTATE
//! 23505) are surfaced as already-exists errors.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use storefront_core::{EntityKind, Module};

use crate::document::{doc_id, natural_key, Document};
use crate::error::{is_unique_violation, StoreError, StoreResult};
use crate::link::{LinkRecord, LinkSide};
use crate::store::DocumentStore;

const LINK_COLUMNS: &str = "\
    left_module, left_key, left_id, right_module, right_key, right_id";

/// Document store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn reject_embedded(kind: EntityKind) -> StoreResult<()> {
    if kind.is_embedded() {
        return Err(StoreError::Malformed(format!(
            "{kind} is embedded and has no collection"
        )));
    }
    Ok(())
}

/// Map a unique violation onto [`StoreError::AlreadyExists`].
fn classify_insert_error(err: sqlx::Error, kind: EntityKind, key: String) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::AlreadyExists { kind, key }
    } else {
        StoreError::Database(err)
    }
}

fn side_from_row(row: &sqlx::postgres::PgRow, prefix: &str) -> StoreResult<LinkSide> {
    let module: String = row.try_get(format!("{prefix}_module").as_str())?;
    let key: String = row.try_get(format!("{prefix}_key").as_str())?;
    let id: String = row.try_get(format!("{prefix}_id").as_str())?;
    let module: Module = module
        .parse()
        .map_err(|e: storefront_core::CoreError| StoreError::Malformed(e.to_string()))?;
    Ok(LinkSide::new(module, key, id))
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn list(&self, kind: EntityKind) -> StoreResult<Vec<Document>> {
        reject_embedded(kind)?;
        let rows: Vec<Json<Document>> =
            sqlx::query_scalar("SELECT data FROM documents WHERE entity = $1 ORDER BY seq")
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Option<Document>> {
        reject_embedded(kind)?;
        let row: Option<Json<Document>> =
            sqlx::query_scalar("SELECT data FROM documents WHERE entity = $1 AND id = $2")
                .bind(kind.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn insert(&self, kind: EntityKind, doc: Document) -> StoreResult<Document> {
        reject_embedded(kind)?;
        let id = doc_id(&doc)?.to_string();
        let key = natural_key(kind, &doc);
        let conflict_key = key.clone().unwrap_or_else(|| id.clone());
        sqlx::query(
            "INSERT INTO documents (id, entity, natural_key, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(&id)
        .bind(kind.as_str())
        .bind(key.as_deref())
        .bind(Json(&doc))
        .execute(&self.pool)
        .await
        .map_err(|e| classify_insert_error(e, kind, conflict_key))?;
        Ok(doc)
    }

    async fn replace(&self, kind: EntityKind, doc: Document) -> StoreResult<Document> {
        reject_embedded(kind)?;
        let id = doc_id(&doc)?.to_string();
        let key = natural_key(kind, &doc);
        let conflict_key = key.clone().unwrap_or_else(|| id.clone());
        let result = sqlx::query(
            "UPDATE documents SET natural_key = $3, data = $4, updated_at = NOW() \
             WHERE entity = $1 AND id = $2",
        )
        .bind(kind.as_str())
        .bind(&id)
        .bind(key.as_deref())
        .bind(Json(&doc))
        .execute(&self.pool)
        .await
        .map_err(|e| classify_insert_error(e, kind, conflict_key))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { kind, id });
        }
        Ok(doc)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> StoreResult<bool> {
        reject_embedded(kind)?;
        let result = sqlx::query("DELETE FROM documents WHERE entity = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn position(&self, kind: EntityKind, id: &str) -> StoreResult<Option<i64>> {
        reject_embedded(kind)?;
        let seq: Option<i64> =
            sqlx::query_scalar("SELECT seq FROM documents WHERE entity = $1 AND id = $2")
                .bind(kind.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(seq)
    }

    /// Re-insert with the original `seq`, which keeps `ORDER BY seq` stable.
    async fn restore(&self, kind: EntityKind, doc: Document, position: i64) -> StoreResult<Document> {
        reject_embedded(kind)?;
        let id = doc_id(&doc)?.to_string();
        let key = natural_key(kind, &doc);
        let conflict_key = key.clone().unwrap_or_else(|| id.clone());
        sqlx::query(
            "INSERT INTO documents (seq, id, entity, natural_key, data) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(position)
        .bind(&id)
        .bind(kind.as_str())
        .bind(key.as_deref())
        .bind(Json(&doc))
        .execute(&self.pool)
        .await
        .map_err(|e| classify_insert_error(e, kind, conflict_key))?;
        Ok(doc)
    }

    async fn insert_link(&self, link: &LinkRecord) -> StoreResult<()> {
        let (l, r) = (link.left(), link.right());
        let query = format!("INSERT INTO links ({LINK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)");
        sqlx::query(&query)
            .bind(l.module.as_str())
            .bind(&l.key)
            .bind(&l.id)
            .bind(r.module.as_str())
            .bind(&r.key)
            .bind(&r.id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateLink(link.composite_key())
                } else {
                    StoreError::Database(e)
                }
            })?;
        Ok(())
    }

    async fn list_links(&self) -> StoreResult<Vec<LinkRecord>> {
        let query = format!("SELECT {LINK_COLUMNS} FROM links ORDER BY seq");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(LinkRecord::new(
                    side_from_row(row, "left")?,
                    side_from_row(row, "right")?,
                ))
            })
            .collect()
    }

    async fn delete_link(&self, link: &LinkRecord) -> StoreResult<bool> {
        let (l, r) = (link.left(), link.right());
        let result = sqlx::query(
            "DELETE FROM links WHERE left_module = $1 AND left_key = $2 AND left_id = $3 \
             AND right_module = $4 AND right_key = $5 AND right_id = $6",
        )
        .bind(l.module.as_str())
        .bind(&l.key)
        .bind(&l.id)
        .bind(r.module.as_str())
        .bind(&r.key)
        .bind(&r.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
