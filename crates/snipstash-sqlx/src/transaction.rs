// Transaction-scoped storage.
//
// A sqlx transaction has to be held somewhere `Send` while trait methods
// borrow it mutably one statement at a time, so it sits behind a tokio
// `Mutex` as an `Option`. Commit and rollback take the transaction out for
// good; any call after that reports it as consumed instead of panicking.

use std::fmt;

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;
use tokio::sync::Mutex;

use snipstash_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use snipstash_core::db::schema::AppSchema;
use snipstash_core::error::SnipstashError;

use crate::adapter::{db_err, decode_row};
use crate::statement::{self, Statement};

type AnyTx = sqlx::Transaction<'static, sqlx::Any>;

/// Storage handle scoped to one open database transaction.
///
/// Implements the full `Adapter` surface, so callers run the same operations
/// they would against the pool and then `commit` or `rollback`.
pub struct SqlxTransaction {
    tx: Mutex<Option<AnyTx>>,
}

impl fmt::Debug for SqlxTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxTransaction").finish_non_exhaustive()
    }
}

fn consumed() -> SnipstashError {
    SnipstashError::Other("Transaction already consumed".into())
}

impl SqlxTransaction {
    pub(crate) fn begin(tx: AnyTx) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    async fn rows(&self, stmt: &Statement) -> Result<Vec<AnyRow>, SnipstashError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;
        stmt.as_query().fetch_all(&mut **tx).await.map_err(db_err)
    }

    async fn row(&self, stmt: &Statement) -> Result<Option<AnyRow>, SnipstashError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;
        stmt.as_query()
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_err)
    }

    async fn exec(&self, stmt: &Statement) -> Result<u64, SnipstashError> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(consumed)?;
        let done = stmt
            .as_query()
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl Adapter for SqlxTransaction {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
        _select: Option<&[String]>,
    ) -> AdapterResult<serde_json::Value> {
        tracing::trace!("[Sqlx Tx] CREATE on '{model}'");
        let row = data
            .as_object()
            .ok_or_else(|| SnipstashError::Database("create expects a JSON object".into()))?;
        self.exec(&statement::insert_row(model, row)).await?;

        // Same select-back dance as the pool adapter; RETURNING is off the
        // table under the Any driver.
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
        tracing::trace!("[Sqlx Tx] FIND_ONE on '{model}'");
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
        tracing::trace!("[Sqlx Tx] FIND_MANY on '{model}'");
        let rows = self.rows(&statement::select_rows(model, &query)).await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        tracing::trace!("[Sqlx Tx] COUNT on '{model}'");
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
        tracing::trace!("[Sqlx Tx] UPDATE on '{model}'");
        let changes = data
            .as_object()
            .ok_or_else(|| SnipstashError::Database("update expects a JSON object".into()))?;
        let touched = self
            .exec(&statement::update_rows(model, where_clauses, changes))
            .await?;
        if touched == 0 {
            return Ok(None);
        }
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
        tracing::trace!("[Sqlx Tx] UPDATE_MANY on '{model}'");
        let changes = data
            .as_object()
            .ok_or_else(|| SnipstashError::Database("update expects a JSON object".into()))?;
        let touched = self
            .exec(&statement::update_rows(model, where_clauses, changes))
            .await?;
        Ok(touched as i64)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        tracing::trace!("[Sqlx Tx] DELETE on '{model}'");
        self.exec(&statement::delete_rows(model, where_clauses))
            .await?;
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        tracing::trace!("[Sqlx Tx] DELETE_MANY on '{model}'");
        let removed = self
            .exec(&statement::delete_rows(model, where_clauses))
            .await?;
        Ok(removed as i64)
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Err(SnipstashError::Other(
            "Schema changes cannot run inside a transaction".into(),
        ))
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(SnipstashError::Other(
            "Nested transactions are not supported".into(),
        ))
    }
}

#[async_trait]
impl TransactionAdapter for SqlxTransaction {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let tx = self.tx.into_inner().ok_or_else(consumed)?;
        tx.commit().await.map_err(db_err)
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        let tx = self.tx.into_inner().ok_or_else(consumed)?;
        tx.rollback().await.map_err(db_err)
    }
}
