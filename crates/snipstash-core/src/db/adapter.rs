// Storage adapter contract.
//
// Backends implement this one trait and the rest of the workspace stays
// oblivious to where rows actually live. Rows travel as `serde_json::Value`
// objects keyed by the camelCase field names from the schema DSL; the typed
// store in the `snipstash` crate does the model conversion on top.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::schema::AppSchema;
use crate::error::SnipstashError;

pub type AdapterResult<T> = std::result::Result<T, SnipstashError>;

// ─── Filters ─────────────────────────────────────────────────────

/// Comparison operator for a single filter condition.
///
/// `Contains` doubles as membership on stored tag lists: tags are kept as
/// JSON text, so a quoted needle turns the substring match into a whole-tag
/// test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    In,
    Contains,
}

impl Default for Operator {
    fn default() -> Self {
        Self::Eq
    }
}

/// Joins one condition to the next. The connector lives on the clause
/// *before* the join, so `eq("userId", u).and()` followed by
/// `eq("language", "rust")` reads in filter order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
}

/// One condition of a row filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub operator: Operator,
    /// Join to the following clause; `None` on the last clause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
}

impl WhereClause {
    /// `field = value`.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator: Operator::Eq,
            connector: None,
        }
    }

    /// `field != value`.
    pub fn ne(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            operator: Operator::Ne,
            ..Self::eq(field, value)
        }
    }

    /// `field IN (values)`. Pass a JSON array.
    pub fn is_in(field: impl Into<String>, values: impl Into<serde_json::Value>) -> Self {
        Self {
            operator: Operator::In,
            ..Self::eq(field, values)
        }
    }

    /// `field IS NULL` (matches rows where the field is null or absent).
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::eq(field, serde_json::Value::Null)
    }

    /// Substring match on `field`.
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: serde_json::Value::String(needle.into()),
            operator: Operator::Contains,
            connector: None,
        }
    }

    pub fn and(mut self) -> Self {
        self.connector = Some(Connector::And);
        self
    }

    pub fn or(mut self) -> Self {
        self.connector = Some(Connector::Or);
        self
    }
}

// ─── Queries ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Field + direction for ORDER BY.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Everything `find_many` accepts: filters, ordering, a window, and an
/// optional projection of returned fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyQuery {
    pub where_clauses: Vec<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
}

// ─── Schema Maintenance ──────────────────────────────────────────

/// Outcome of comparing the live database against the declared schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchemaStatus {
    UpToDate,
    /// Live schema is behind. Carries the DDL statements that would close
    /// the gap.
    NeedsMigration { statements: Vec<String> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Apply the computed DDL immediately instead of just reporting it.
    #[serde(default)]
    pub auto_migrate: bool,
}

// ─── The Trait ───────────────────────────────────────────────────

/// CRUD plus counting, schema maintenance, and transactions.
///
/// `model` is always the table name ("snippets", "community", ...). Backends
/// must fill in a generated `id` when the supplied row lacks one.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Insert a row and return it as stored.
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
        select: Option<&[String]>,
    ) -> AdapterResult<serde_json::Value>;

    /// First row matching the filter, if any.
    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// All rows matching the query, after sort/offset/limit.
    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>>;

    /// Number of rows matching the filter.
    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64>;

    /// Update the first matching row. `None` when nothing matched.
    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Update every matching row, returning how many were touched.
    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64>;

    /// Delete the first matching row. Deleting nothing is not an error.
    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()>;

    /// Delete every matching row, returning how many went away.
    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64>;

    /// Compare (and optionally migrate) the live schema against `schema`.
    async fn create_schema(
        &self,
        schema: &AppSchema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus>;

    /// Open a transaction. The returned adapter sees and stages writes that
    /// become visible to others only on `commit`.
    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>>;
}

/// An [`Adapter`] scoped to one open transaction.
#[async_trait]
pub trait TransactionAdapter: Adapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()>;

    async fn rollback(self: Box<Self>) -> AdapterResult<()>;
}
