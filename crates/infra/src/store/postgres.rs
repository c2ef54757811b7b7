//! Postgres-backed record store implementation.
//!
//! Each record collection maps to one table holding the serialized document:
//!
//! ```sql
//! CREATE TABLE <collection> (
//!     id         UUID PRIMARY KEY,
//!     version    BIGINT NOT NULL,
//!     unique_key TEXT UNIQUE,
//!     body       JSONB NOT NULL
//! )
//! ```
//!
//! Predicates compile to comparisons over `body->>'<field>'`, so no per-type
//! column mapping is needed. The `version` column is authoritative; the copy
//! inside `body` is overwritten on read.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Anything else | Any | `Unavailable` |
//!
//! A zero-row conditional `UPDATE` is resolved to `NotFound` or `Concurrency`
//! with a follow-up lookup.

use std::marker::PhantomData;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use trove_core::record::ID_FIELD;
use trove_core::{Entity, ExpectedVersion, Predicate, Record};

use super::r#trait::{RecordStore, StoreError};

/// Postgres-backed record store for one record type.
///
/// Uses the SQLx connection pool, which is thread-safe (Arc + Send + Sync).
pub struct PostgresRecordStore<T> {
    pool: Arc<PgPool>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for PostgresRecordStore<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _record: PhantomData,
        }
    }
}

#[derive(Debug)]
enum Bind {
    Text(String),
    TextList(Vec<String>),
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn column(field: &str) -> Result<String, StoreError> {
    if !is_identifier(field) {
        return Err(StoreError::Unavailable(format!("invalid field name '{field}'")));
    }
    if field == ID_FIELD {
        Ok("id::text".to_string())
    } else {
        Ok(format!("body->>'{field}'"))
    }
}

/// Compile a predicate into a SQL boolean expression with positional binds.
fn compile(predicate: &Predicate, binds: &mut Vec<Bind>) -> Result<String, StoreError> {
    match predicate {
        Predicate::All => Ok("TRUE".to_string()),
        Predicate::Eq(field, value) => {
            let col = column(field)?;
            binds.push(Bind::Text(value.to_text()));
            Ok(format!("{col} = ${}", binds.len()))
        }
        Predicate::In(field, values) => {
            if values.is_empty() {
                return Ok("FALSE".to_string());
            }
            let col = column(field)?;
            binds.push(Bind::TextList(values.iter().map(|v| v.to_text()).collect()));
            Ok(format!("{col} = ANY(${})", binds.len()))
        }
        Predicate::And(parts) => {
            if parts.is_empty() {
                return Ok("TRUE".to_string());
            }
            let compiled = parts
                .iter()
                .map(|p| compile(p, binds).map(|sql| format!("({sql})")))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(compiled.join(" AND "))
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Duplicate(format!("{operation}: {}", db.message()))
        }
        _ => StoreError::Unavailable(format!("{operation}: {err}")),
    }
}

fn decode_row<T: Record>(row: &PgRow) -> Result<T, StoreError> {
    let version: i64 = row
        .try_get("version")
        .map_err(|e| StoreError::Serialization(format!("version column: {e}")))?;
    let body: serde_json::Value = row
        .try_get("body")
        .map_err(|e| StoreError::Serialization(format!("body column: {e}")))?;
    let mut record: T = serde_json::from_value(body)
        .map_err(|e| StoreError::Serialization(format!("{}: {e}", T::COLLECTION)))?;
    record.set_version(version as u64);
    Ok(record)
}

fn encode_body<T: Record>(record: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Serialization(format!("{}: {e}", T::COLLECTION)))
}

impl<T: Record> PostgresRecordStore<T> {
    /// Create a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self::from_shared(Arc::new(pool))
    }

    /// Share one pool between several stores.
    pub fn from_shared(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    /// Create the backing table if it does not exist.
    #[instrument(skip(self), fields(collection = T::COLLECTION), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                version BIGINT NOT NULL,
                unique_key TEXT UNIQUE,
                body JSONB NOT NULL
            )
            "#,
            table = T::COLLECTION
        );
        sqlx::query(&sql)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = T::COLLECTION), err)]
    pub async fn select(&self, predicate: &Predicate, limit: Option<i64>) -> Result<Vec<T>, StoreError> {
        let mut binds = Vec::new();
        let clause = compile(predicate, &mut binds)?;
        let mut sql = format!("SELECT version, body FROM {} WHERE {clause}", T::COLLECTION);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(v) => query.bind(v),
                Bind::TextList(v) => query.bind(v),
            };
        }

        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("select", e))?;

        rows.iter().map(decode_row::<T>).collect()
    }

    #[instrument(skip(self, record), fields(collection = T::COLLECTION, id = %record.id()), err)]
    pub async fn insert(&self, mut record: T) -> Result<T, StoreError> {
        record.set_version(1);
        let id: Uuid = record.id().into();
        let body = encode_body(&record)?;

        let sql = format!(
            "INSERT INTO {} (id, version, unique_key, body) VALUES ($1, 1, $2, $3)",
            T::COLLECTION
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(record.unique_key())
            .bind(body)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;

        Ok(record)
    }

    #[instrument(skip(self, record), fields(collection = T::COLLECTION, id = %record.id()), err)]
    pub async fn replace(&self, mut record: T, expected: ExpectedVersion) -> Result<T, StoreError> {
        let id: Uuid = record.id().into();
        let expected_version: Option<i64> = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };
        let body = encode_body(&record)?;

        let sql = format!(
            r#"
            UPDATE {}
            SET version = version + 1, unique_key = $2, body = $3
            WHERE id = $1 AND ($4::BIGINT IS NULL OR version = $4)
            RETURNING version
            "#,
            T::COLLECTION
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(record.unique_key())
            .bind(body)
            .bind(expected_version)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

        if let Some(row) = row {
            let version: i64 = row
                .try_get("version")
                .map_err(|e| StoreError::Serialization(format!("version column: {e}")))?;
            record.set_version(version as u64);
            return Ok(record);
        }

        // Nothing written: either the record is gone or the version moved on.
        let sql = format!("SELECT version FROM {} WHERE id = $1", T::COLLECTION);
        let current: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

        match current {
            None => Err(StoreError::NotFound(format!("{}: id {id}", T::COLLECTION))),
            Some(actual) => Err(StoreError::Concurrency(format!(
                "{}: expected {expected:?}, found {actual}",
                T::COLLECTION
            ))),
        }
    }
}

#[async_trait::async_trait]
impl<T: Record> RecordStore<T> for PostgresRecordStore<T> {
    async fn get_all(&self, predicate: &Predicate) -> Result<Vec<T>, StoreError> {
        self.select(predicate, None).await
    }

    async fn get_one(&self, predicate: &Predicate) -> Result<Option<T>, StoreError> {
        let mut found = self.select(predicate, Some(2)).await?;
        if found.len() > 1 {
            return Err(StoreError::Ambiguous {
                collection: T::COLLECTION,
            });
        }
        Ok(found.pop())
    }

    async fn create(&self, record: T) -> Result<T, StoreError> {
        self.insert(record).await
    }

    async fn update(&self, record: T, expected: ExpectedVersion) -> Result<T, StoreError> {
        self.replace(record, expected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::{CatalogItemId, UserId};
    use trove_inventory::InventoryRecord;

    #[test]
    fn compiles_pair_lookup_to_body_comparisons() {
        let user = UserId::new();
        let item = CatalogItemId::new();
        let mut binds = Vec::new();

        let sql = compile(&InventoryRecord::for_pair(user, item), &mut binds).unwrap();

        assert_eq!(sql, "(body->>'user_id' = $1) AND (body->>'catalog_item_id' = $2)");
        assert!(matches!(&binds[0], Bind::Text(v) if *v == user.to_string()));
        assert!(matches!(&binds[1], Bind::Text(v) if *v == item.to_string()));
    }

    #[test]
    fn compiles_id_membership_against_primary_key() {
        let ids = [CatalogItemId::new(), CatalogItemId::new()];
        let mut binds = Vec::new();

        let sql = compile(&trove_catalog::CatalogItem::with_ids(ids), &mut binds).unwrap();

        assert_eq!(sql, "id::text = ANY($1)");
        assert!(matches!(&binds[0], Bind::TextList(v) if v.len() == 2));
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let mut binds = Vec::new();
        let sql = compile(&Predicate::In("user_id", vec![]), &mut binds).unwrap();
        assert_eq!(sql, "FALSE");
        assert!(binds.is_empty());
    }

    #[test]
    fn rejects_non_identifier_fields() {
        let mut binds = Vec::new();
        let err = compile(&Predicate::eq("name'; DROP TABLE x; --", "a"), &mut binds).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
