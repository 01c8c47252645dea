// Storage backend on sqlx's Any driver.
//
// One `SqlxAdapter` wraps an `AnyPool` shared across handlers. The Any driver
// speaks Postgres, MySQL, and SQLite from a single build, with two quirks the
// code below works around: there is no RETURNING clause (writes are followed
// by a select-back) and rows come back untyped (columns are decoded by
// probing).

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};

use snipstash_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use snipstash_core::db::schema::AppSchema;
use snipstash_core::error::SnipstashError;

use crate::statement::{self, Statement};
use crate::transaction::SqlxTransaction;

/// Database-backed storage over a shared `AnyPool`.
#[derive(Debug, Clone)]
pub struct SqlxAdapter {
    pool: AnyPool,
}

impl SqlxAdapter {
    /// Wrap an already-connected pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and wrap the resulting pool.
    ///
    /// Registers the compiled-in Any drivers first; without that step sqlx
    /// rejects every URL scheme.
    pub async fn connect(url: &str) -> Result<Self, SnipstashError> {
        sqlx::any::install_default_drivers();

        // Each connection to an in-memory SQLite URL opens its own empty
        // database, so such pools must never grow past one connection.
        let mut options = AnyPoolOptions::new();
        if url.contains(":memory:") || url.contains("mode=memory") {
            options = options.max_connections(1);
        }
        let pool = options
            .connect(url)
            .await
            .map_err(|e| SnipstashError::Database(format!("connect failed: {e}")))?;

        Ok(Self { pool })
    }

    /// The underlying pool, for callers that need raw access.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    async fn rows(&self, stmt: &Statement) -> Result<Vec<AnyRow>, SnipstashError> {
        stmt.as_query().fetch_all(&self.pool).await.map_err(db_err)
    }

    async fn row(&self, stmt: &Statement) -> Result<Option<AnyRow>, SnipstashError> {
        stmt.as_query()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn exec(&self, stmt: &Statement) -> Result<u64, SnipstashError> {
        let done = stmt.as_query().execute(&self.pool).await.map_err(db_err)?;
        Ok(done.rows_affected())
    }
}

pub(crate) fn db_err(err: sqlx::Error) -> SnipstashError {
    SnipstashError::Database(err.to_string())
}

/// Decode an `AnyRow` into a JSON object keyed by column name.
///
/// The Any driver erases column types, so each value is probed in order:
/// text, the integer widths, floats, booleans, and finally NULL.
pub(crate) fn decode_row(row: &AnyRow) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    for column in row.columns() {
        let name = column.name();
        fields.insert(name.to_string(), decode_column(row, name));
    }
    serde_json::Value::Object(fields)
}

fn decode_column(row: &AnyRow, name: &str) -> serde_json::Value {
    if let Ok(text) = row.try_get::<String, _>(name) {
        return serde_json::Value::String(text);
    }
    if let Ok(whole) = row.try_get::<i64, _>(name) {
        return serde_json::Value::Number(whole.into());
    }
    if let Ok(whole) = row.try_get::<i32, _>(name) {
        return serde_json::Value::Number(whole.into());
    }
    if let Ok(real) = row.try_get::<f64, _>(name) {
        return serde_json::Number::from_f64(real)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(flag) = row.try_get::<bool, _>(name) {
        return serde_json::Value::Bool(flag);
    }
    serde_json::Value::Null
}

#[async_trait]
impl Adapter for SqlxAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
        _select: Option<&[String]>,
    ) -> AdapterResult<serde_json::Value> {
        tracing::debug!("[Sqlx Adapter] CREATE on '{model}'");
        let row = data
            .as_object()
            .ok_or_else(|| SnipstashError::Database("create expects a JSON object".into()))?;
        self.exec(&statement::insert_row(model, row)).await?;

        // No RETURNING under the Any driver: read the row back by id. Rows
        // inserted without one come back as the input payload.
        match row.get("id").cloned() {
            Some(id) => {
                let select = statement::select_first(model, &[WhereClause::eq("id", id)]);
                let stored = self.row(&select).await?.ok_or_else(|| {
                    SnipstashError::Database(format!("inserted row vanished from '{model}'"))
                })?;
                Ok(decode_row(&stored))
            }
            None => Ok(data),
        }
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        tracing::debug!("[Sqlx Adapter] FIND_ONE on '{model}'");
        let row = self
            .row(&statement::select_first(model, where_clauses))
            .await?;
        Ok(row.as_ref().map(decode_row))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        tracing::debug!("[Sqlx Adapter] FIND_MANY on '{model}'");
        let rows = self.rows(&statement::select_rows(model, &query)).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        tracing::debug!("[Sqlx Adapter] COUNT on '{model}'");
        let row = self
            .row(&statement::count_rows(model, where_clauses))
            .await?
            .ok_or_else(|| SnipstashError::Database("COUNT returned no row".into()))?;
        row.try_get::<i64, _>("total").map_err(db_err)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        tracing::debug!("[Sqlx Adapter] UPDATE on '{model}'");
        let changes = data
            .as_object()
            .ok_or_else(|| SnipstashError::Database("update expects a JSON object".into()))?;
        let touched = self
            .exec(&statement::update_rows(model, where_clauses, changes))
            .await?;
        if touched == 0 {
            return Ok(None);
        }
        // Read the row back through the same filter.
        let stored = self
            .row(&statement::select_first(model, where_clauses))
            .await?;
        Ok(stored.as_ref().map(decode_row))
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64> {
        tracing::debug!("[Sqlx Adapter] UPDATE_MANY on '{model}'");
        let changes = data
            .as_object()
            .ok_or_else(|| SnipstashError::Database("update expects a JSON object".into()))?;
        let touched = self
            .exec(&statement::update_rows(model, where_clauses, changes))
            .await?;
        Ok(touched as i64)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        tracing::debug!("[Sqlx Adapter] DELETE on '{model}'");
        self.exec(&statement::delete_rows(model, where_clauses))
            .await?;
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        tracing::debug!("[Sqlx Adapter] DELETE_MANY on '{model}'");
        let removed = self
            .exec(&statement::delete_rows(model, where_clauses))
            .await?;
        Ok(removed as i64)
    }

    async fn create_schema(
        &self,
        schema: &AppSchema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        crate::schema::create_schema(&self.pool, schema, options).await
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        tracing::debug!("[Sqlx Adapter] BEGIN");
        let tx = self.pool.begin().await.map_err(db_err)?;
        Ok(Box::new(SqlxTransaction::begin(tx)))
    }
}
