// In-memory storage backend.
//
// Rows live in a `HashMap<table, Vec<Value>>` behind a tokio `RwLock`. The
// adapter and its transactions share one row engine (`TableSet`); a
// transaction works on a copied table map and swaps it into the live one on
// commit. Everything is lost on drop, which is the point: this backend
// exists for tests and local development.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use snipstash_core::db::adapter::{
    Adapter, AdapterResult, Connector, FindManyQuery, Operator, SchemaOptions, SchemaStatus,
    SortBy, SortDirection, TransactionAdapter, WhereClause,
};
use snipstash_core::db::schema::AppSchema;
use snipstash_core::error::SnipstashError;

/// Table name → rows.
pub type Tables = HashMap<String, Vec<Value>>;

// ─── Row Matching ────────────────────────────────────────────────

/// Evaluate a filter left to right. Each clause joins the running result
/// with AND, unless the *previous* clause carried an OR connector.
fn matches_where(row: &Value, clauses: &[WhereClause]) -> bool {
    let mut matched = true;
    let mut join_with_or = false;

    for clause in clauses {
        let hit = clause_hit(row, clause);
        matched = if join_with_or { matched || hit } else { matched && hit };
        join_with_or = clause.connector == Some(Connector::Or);
    }

    matched
}

fn clause_hit(row: &Value, clause: &WhereClause) -> bool {
    // A missing field behaves like an explicit null, so `is_null` filters
    // catch both.
    let field = row.get(&clause.field).unwrap_or(&Value::Null);

    match clause.operator {
        Operator::Eq => field == &clause.value,
        Operator::Ne => field != &clause.value,
        Operator::In => clause
            .value
            .as_array()
            .is_some_and(|wanted| wanted.contains(field)),
        Operator::Contains => match (field.as_str(), clause.value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
    }
}

// ─── Sorting and Shaping ─────────────────────────────────────────

/// Order two field values. Numbers compare numerically, strings
/// lexicographically, null sorts first; anything else ties.
fn rank(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn sort_rows(rows: &mut [Value], sort: &SortBy) {
    rows.sort_by(|a, b| {
        let ordering = rank(
            a.get(&sort.field).unwrap_or(&Value::Null),
            b.get(&sort.field).unwrap_or(&Value::Null),
        );
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn window(rows: Vec<Value>, limit: Option<i64>, offset: Option<i64>) -> Vec<Value> {
    let skip = offset.unwrap_or(0).max(0) as usize;
    let take = limit.map_or(usize::MAX, |l| l.max(0) as usize);
    rows.into_iter().skip(skip).take(take).collect()
}

fn project(row: &Value, keep: &[String]) -> Value {
    match row.as_object() {
        Some(fields) => Value::Object(
            fields
                .iter()
                .filter(|(name, _)| keep.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        ),
        None => row.clone(),
    }
}

fn overlay(row: &mut Value, data: &Value) {
    if let (Some(row), Some(data)) = (row.as_object_mut(), data.as_object()) {
        for (name, value) in data {
            row.insert(name.clone(), value.clone());
        }
    }
}

fn ensure_id(data: &mut Value) -> AdapterResult<()> {
    let row = data
        .as_object_mut()
        .ok_or_else(|| SnipstashError::Database("create expects a JSON object".into()))?;
    let missing = matches!(row.get("id"), None | Some(Value::Null));
    if missing {
        row.insert(
            "id".to_string(),
            Value::String(uuid::Uuid::new_v4().to_string()),
        );
    }
    Ok(())
}

// ─── Row Engine ──────────────────────────────────────────────────

/// The row operations both the adapter and its transactions run on.
#[derive(Debug, Clone, Default)]
struct TableSet {
    inner: Arc<RwLock<Tables>>,
}

impl TableSet {
    fn seeded(tables: Tables) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tables)),
        }
    }

    async fn copy(&self) -> Tables {
        self.inner.read().await.clone()
    }

    async fn replace(&self, tables: Tables) {
        *self.inner.write().await = tables;
    }

    async fn insert(&self, model: &str, mut data: Value) -> AdapterResult<Value> {
        ensure_id(&mut data)?;
        self.inner
            .write()
            .await
            .entry(model.to_string())
            .or_default()
            .push(data.clone());
        Ok(data)
    }

    async fn first(&self, model: &str, clauses: &[WhereClause]) -> Option<Value> {
        self.inner
            .read()
            .await
            .get(model)
            .and_then(|rows| rows.iter().find(|r| matches_where(r, clauses)).cloned())
    }

    async fn search(&self, model: &str, query: &FindManyQuery) -> Vec<Value> {
        let mut rows: Vec<Value> = self
            .inner
            .read()
            .await
            .get(model)
            .map(|rows| {
                rows.iter()
                    .filter(|r| matches_where(r, &query.where_clauses))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.sort_by {
            sort_rows(&mut rows, sort);
        }
        let rows = window(rows, query.limit, query.offset);

        match query.select.as_deref() {
            Some(keep) if !keep.is_empty() => rows.iter().map(|r| project(r, keep)).collect(),
            _ => rows,
        }
    }

    async fn tally(&self, model: &str, clauses: &[WhereClause]) -> i64 {
        self.inner
            .read()
            .await
            .get(model)
            .map_or(0, |rows| {
                rows.iter().filter(|r| matches_where(r, clauses)).count() as i64
            })
    }

    async fn patch_first(
        &self,
        model: &str,
        clauses: &[WhereClause],
        data: &Value,
    ) -> Option<Value> {
        let mut guard = self.inner.write().await;
        let rows = guard.get_mut(model)?;
        let row = rows.iter_mut().find(|r| matches_where(r, clauses))?;
        overlay(row, data);
        Some(row.clone())
    }

    async fn patch_all(&self, model: &str, clauses: &[WhereClause], data: &Value) -> i64 {
        let mut guard = self.inner.write().await;
        let Some(rows) = guard.get_mut(model) else {
            return 0;
        };
        let mut touched = 0;
        for row in rows.iter_mut() {
            if matches_where(row, clauses) {
                overlay(row, data);
                touched += 1;
            }
        }
        touched
    }

    async fn remove_first(&self, model: &str, clauses: &[WhereClause]) {
        if let Some(rows) = self.inner.write().await.get_mut(model) {
            if let Some(at) = rows.iter().position(|r| matches_where(r, clauses)) {
                rows.remove(at);
            }
        }
    }

    async fn remove_all(&self, model: &str, clauses: &[WhereClause]) -> i64 {
        let mut guard = self.inner.write().await;
        let Some(rows) = guard.get_mut(model) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|r| !matches_where(r, clauses));
        (before - rows.len()) as i64
    }
}

// ─── Adapter ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    rows: TableSet,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter pre-populated with rows.
    pub fn with_data(tables: Tables) -> Self {
        Self {
            rows: TableSet::seeded(tables),
        }
    }

    /// A copy of everything currently stored. Test helper.
    pub async fn snapshot(&self) -> Tables {
        self.rows.copy().await
    }

    pub async fn clear(&self) {
        self.rows.replace(Tables::new()).await;
    }

    /// Row count for one table. Test helper.
    pub async fn model_count(&self, model: &str) -> usize {
        self.rows.inner.read().await.get(model).map_or(0, Vec::len)
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(
        &self,
        model: &str,
        data: Value,
        _select: Option<&[String]>,
    ) -> AdapterResult<Value> {
        self.rows.insert(model, data).await
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<Value>> {
        Ok(self.rows.first(model, where_clauses).await)
    }

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>> {
        Ok(self.rows.search(model, &query).await)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        Ok(self.rows.tally(model, where_clauses).await)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Option<Value>> {
        Ok(self.rows.patch_first(model, where_clauses, &data).await)
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<i64> {
        Ok(self.rows.patch_all(model, where_clauses, &data).await)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        self.rows.remove_first(model, where_clauses).await;
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        Ok(self.rows.remove_all(model, where_clauses).await)
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        // Nothing persistent to migrate
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Ok(Box::new(MemoryTransaction {
            live: self.rows.clone(),
            working: TableSet::seeded(self.rows.copy().await),
        }))
    }
}

// ─── Transactions ────────────────────────────────────────────────

/// Copy-on-begin transaction. Writes land in `working`; `commit` swaps the
/// working tables into the live set, `rollback` just drops them.
#[derive(Debug)]
pub struct MemoryTransaction {
    live: TableSet,
    working: TableSet,
}

#[async_trait]
impl Adapter for MemoryTransaction {
    async fn create(
        &self,
        model: &str,
        data: Value,
        _select: Option<&[String]>,
    ) -> AdapterResult<Value> {
        self.working.insert(model, data).await
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<Value>> {
        Ok(self.working.first(model, where_clauses).await)
    }

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>> {
        Ok(self.working.search(model, &query).await)
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        Ok(self.working.tally(model, where_clauses).await)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Option<Value>> {
        Ok(self.working.patch_first(model, where_clauses, &data).await)
    }

    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<i64> {
        Ok(self.working.patch_all(model, where_clauses, &data).await)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        self.working.remove_first(model, where_clauses).await;
        Ok(())
    }

    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        Ok(self.working.remove_all(model, where_clauses).await)
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(SnipstashError::Other(
            "Nested transactions are not supported in the memory adapter".into(),
        ))
    }
}

#[async_trait]
impl TransactionAdapter for MemoryTransaction {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let staged = self.working.copy().await;
        self.live.replace(staged).await;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        Ok(())
    }
}
