use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use std::time::Instant;
use tracing::{info, warn};

use super::store::{document_id, unique_fields, Document, DocumentStore, StoreError, COLLECTIONS};
use crate::config;
use crate::filter::{Filter, FilterData, SqlResult};

/// Postgres-backed store: one table per collection, documents in a `jsonb` column
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create collection tables and indexes if they are missing
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for collection in COLLECTIONS {
            Filter::new(*collection)?;
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS \"{c}\" (
                    seq BIGSERIAL,
                    id UUID PRIMARY KEY,
                    doc JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )",
                c = collection
            );
            sqlx::query(&ddl).execute(&self.pool).await?;

            let index = format!(
                "CREATE INDEX IF NOT EXISTS \"{c}_doc_idx\" ON \"{c}\" USING GIN (doc jsonb_path_ops)",
                c = collection
            );
            sqlx::query(&index).execute(&self.pool).await?;

            for field in unique_fields(collection) {
                let unique = format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS \"{c}_{f}_key\" ON \"{c}\" ((doc ->> '{f}'))",
                    c = collection,
                    f = field
                );
                sqlx::query(&unique).execute(&self.pool).await?;
            }
        }
        info!("Migrated {} collections", COLLECTIONS.len());
        Ok(())
    }

    fn compile(collection: &str, filter: FilterData) -> Result<Filter, StoreError> {
        let mut compiled = Filter::new(collection)?;
        compiled.assign(filter)?;
        Ok(compiled)
    }

    fn bind_all<'q>(mut query: Query<'q, Postgres, PgArguments>, params: Vec<Value>) -> Query<'q, Postgres, PgArguments> {
        for param in params {
            query = query.bind(param);
        }
        query
    }

    fn row_document(row: &PgRow) -> Result<Document, StoreError> {
        match row.try_get::<Value, _>("doc")? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidCollection(format!("stored document is not an object: {}", other))),
        }
    }

    fn log_slow(sql: &SqlResult, started: Instant) {
        let db = &config::config().database;
        let elapsed = started.elapsed().as_millis() as u64;
        if db.enable_slow_query_warning && elapsed > db.slow_query_threshold_ms {
            warn!(elapsed_ms = elapsed, query = %sql.query, "Slow query");
        }
    }

    fn map_write_error(collection: &str, err: sqlx::Error) -> StoreError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(format!("{} already contains this value", collection))
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        Filter::new(collection)?;
        let id = document_id(&doc)?;
        let sql = format!("INSERT INTO \"{}\" (id, doc) VALUES ($1, $2)", collection);
        sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        Ok(())
    }

    async fn find(&self, collection: &str, filter: FilterData) -> Result<Vec<Document>, StoreError> {
        let sql = Self::compile(collection, filter)?.to_sql();
        let started = Instant::now();
        let rows = Self::bind_all(sqlx::query(&sql.query), sql.params.clone())
            .fetch_all(&self.pool)
            .await?;
        Self::log_slow(&sql, started);
        rows.iter().map(Self::row_document).collect()
    }

    async fn count(&self, collection: &str, where_clause: Value) -> Result<i64, StoreError> {
        let sql = Self::compile(collection, FilterData::where_(where_clause))?.to_count_sql();
        let started = Instant::now();
        let row = Self::bind_all(sqlx::query(&sql.query), sql.params.clone())
            .fetch_one(&self.pool)
            .await?;
        Self::log_slow(&sql, started);
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn update_one(&self, collection: &str, where_clause: Value, patch: Document) -> Result<Option<Document>, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let predicate = compiled.to_where_sql(1);
        let sql = SqlResult {
            query: format!(
                "UPDATE \"{t}\" SET doc = doc || $1 WHERE id = (SELECT id FROM \"{t}\" WHERE {w} ORDER BY seq ASC LIMIT 1) RETURNING doc",
                t = collection,
                w = predicate.query
            ),
            params: predicate.params,
        };
        let started = Instant::now();
        let row = Self::bind_all(sqlx::query(&sql.query).bind(Value::Object(patch)), sql.params.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        Self::log_slow(&sql, started);
        row.as_ref().map(Self::row_document).transpose()
    }

    async fn update_many(&self, collection: &str, where_clause: Value, patch: Document) -> Result<u64, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let predicate = compiled.to_where_sql(1);
        let sql = SqlResult {
            query: format!("UPDATE \"{}\" SET doc = doc || $1 WHERE {}", collection, predicate.query),
            params: predicate.params,
        };
        let started = Instant::now();
        let result = Self::bind_all(sqlx::query(&sql.query).bind(Value::Object(patch)), sql.params.clone())
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        Self::log_slow(&sql, started);
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: &str, where_clause: Value) -> Result<u64, StoreError> {
        let compiled = Self::compile(collection, FilterData::where_(where_clause))?;
        let predicate = compiled.to_where_sql(0);
        let sql = SqlResult {
            query: format!("DELETE FROM \"{}\" WHERE {}", collection, predicate.query),
            params: predicate.params,
        };
        let started = Instant::now();
        let result = Self::bind_all(sqlx::query(&sql.query), sql.params.clone())
            .execute(&self.pool)
            .await?;
        Self::log_slow(&sql, started);
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}
