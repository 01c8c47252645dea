// SQL statement assembly for the Any-driver backend.
//
// Filters, sorts, and row payloads arrive as the core adapter types; this
// module flattens them into complete statements with positional $N
// placeholders and typed parameters. The executors in `adapter` and
// `transaction` only ever see a finished `Statement`.

use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::Any;

use snipstash_core::db::adapter::{
    Connector, FindManyQuery, Operator, SortBy, SortDirection, WhereClause,
};

/// One bind parameter, already narrowed to the types the Any driver encodes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BindParam {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

impl BindParam {
    fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(flag) => Self::Int(i64::from(*flag)),
            serde_json::Value::Number(number) => match (number.as_i64(), number.as_f64()) {
                (Some(whole), _) => Self::Int(whole),
                (None, Some(real)) => Self::Float(real),
                (None, None) => Self::Text(number.to_string()),
            },
            serde_json::Value::String(text) => Self::Text(text.clone()),
            // Arrays and objects land as their JSON text.
            other => Self::Text(other.to_string()),
        }
    }
}

/// A finished SQL statement: the text plus its parameters in placeholder order.
#[derive(Debug, Clone)]
pub(crate) struct Statement {
    pub(crate) sql: String,
    pub(crate) params: Vec<BindParam>,
}

impl Statement {
    /// Attach every parameter to a fresh `sqlx::query` over this statement.
    pub(crate) fn as_query(&self) -> Query<'_, Any, AnyArguments<'_>> {
        let mut query = sqlx::query(&self.sql);
        for param in &self.params {
            query = match param {
                BindParam::Text(text) => query.bind(text.as_str()),
                BindParam::Int(whole) => query.bind(*whole),
                BindParam::Float(real) => query.bind(*real),
                BindParam::Null => query.bind(Option::<String>::None),
            };
        }
        query
    }
}

/// INSERT one row. Column order follows the payload's key order.
pub(crate) fn insert_row(
    table: &str,
    row: &serde_json::Map<String, serde_json::Value>,
) -> Statement {
    let mut params = Vec::new();
    let mut columns = Vec::new();
    let mut marks = Vec::new();
    for (name, value) in row {
        columns.push(quote_identifier(name));
        marks.push(push_param(&mut params, value));
    }
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns.join(", "),
            marks.join(", ")
        ),
        params,
    }
}

/// SELECT with the full filter, sort, and window treatment.
pub(crate) fn select_rows(table: &str, query: &FindManyQuery) -> Statement {
    let columns = match &query.select {
        Some(fields) if !fields.is_empty() => {
            let quoted: Vec<String> = fields.iter().map(|f| quote_identifier(f)).collect();
            quoted.join(", ")
        }
        _ => "*".to_string(),
    };
    let mut sql = format!("SELECT {columns} FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, &query.where_clauses);
    push_order(&mut sql, query.sort_by.as_ref());
    push_window(&mut sql, query.limit, query.offset);
    Statement { sql, params }
}

/// SELECT a single row.
pub(crate) fn select_first(table: &str, filter: &[WhereClause]) -> Statement {
    let mut sql = format!("SELECT * FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, filter);
    sql.push_str(" LIMIT 1");
    Statement { sql, params }
}

/// SELECT COUNT(*), aliased to `total` for decoding.
pub(crate) fn count_rows(table: &str, filter: &[WhereClause]) -> Statement {
    let mut sql = format!("SELECT COUNT(*) AS total FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, filter);
    Statement { sql, params }
}

/// UPDATE every row matching the filter. SET parameters come first, so the
/// WHERE placeholders continue their numbering.
pub(crate) fn update_rows(
    table: &str,
    filter: &[WhereClause],
    changes: &serde_json::Map<String, serde_json::Value>,
) -> Statement {
    let mut params = Vec::new();
    let assignments: Vec<String> = changes
        .iter()
        .map(|(name, value)| {
            format!("{} = {}", quote_identifier(name), push_param(&mut params, value))
        })
        .collect();
    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_identifier(table),
        assignments.join(", ")
    );
    push_filter(&mut sql, &mut params, filter);
    Statement { sql, params }
}

/// DELETE every row matching the filter.
pub(crate) fn delete_rows(table: &str, filter: &[WhereClause]) -> Statement {
    let mut sql = format!("DELETE FROM {}", quote_identifier(table));
    let mut params = Vec::new();
    push_filter(&mut sql, &mut params, filter);
    Statement { sql, params }
}

/// Append ` WHERE ...`; an empty filter appends nothing.
fn push_filter(sql: &mut String, params: &mut Vec<BindParam>, filter: &[WhereClause]) {
    for (i, clause) in filter.iter().enumerate() {
        if i == 0 {
            sql.push_str(" WHERE ");
        } else {
            // `.or()` marks the clause *before* the join point.
            match filter[i - 1].connector {
                Some(Connector::Or) => sql.push_str(" OR "),
                _ => sql.push_str(" AND "),
            }
        }
        push_condition(sql, params, clause);
    }
}

fn push_condition(sql: &mut String, params: &mut Vec<BindParam>, clause: &WhereClause) {
    let column = quote_identifier(&clause.field);
    match clause.operator {
        // NULL comparisons have no bound form in SQL.
        Operator::Eq if clause.value.is_null() => {
            sql.push_str(&column);
            sql.push_str(" IS NULL");
        }
        Operator::Ne if clause.value.is_null() => {
            sql.push_str(&column);
            sql.push_str(" IS NOT NULL");
        }
        Operator::Eq => {
            let mark = push_param(params, &clause.value);
            sql.push_str(&format!("{column} = {mark}"));
        }
        Operator::Ne => {
            let mark = push_param(params, &clause.value);
            sql.push_str(&format!("{column} != {mark}"));
        }
        Operator::In => match clause.value.as_array() {
            Some(values) => {
                let marks: Vec<String> =
                    values.iter().map(|value| push_param(params, value)).collect();
                sql.push_str(&format!("{column} IN ({})", marks.join(", ")));
            }
            // A scalar right-hand side degrades to plain equality.
            None => {
                let mark = push_param(params, &clause.value);
                sql.push_str(&format!("{column} = {mark}"));
            }
        },
        Operator::Contains => {
            let needle = clause.value.as_str().unwrap_or_default();
            params.push(BindParam::Text(format!("%{needle}%")));
            sql.push_str(&format!("{column} LIKE ${}", params.len()));
        }
    }
}

fn push_param(params: &mut Vec<BindParam>, value: &serde_json::Value) -> String {
    params.push(BindParam::from_json(value));
    format!("${}", params.len())
}

fn push_order(sql: &mut String, sort: Option<&SortBy>) {
    if let Some(sort) = sort {
        let direction = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        sql.push_str(&format!(
            " ORDER BY {} {direction}",
            quote_identifier(&sort.field)
        ));
    }
}

fn push_window(sql: &mut String, limit: Option<i64>, offset: Option<i64>) {
    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        // SQLite insists on LIMIT coming before OFFSET; -1 leaves it unbounded.
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
}

/// Double-quote an identifier so reserved words survive as table or column
/// names. Embedded quotes are stripped rather than escaped.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_select_without_filter() {
        let stmt = select_rows("snippets", &FindManyQuery::default());
        assert_eq!(stmt.sql, "SELECT * FROM \"snippets\"");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_projection() {
        let query = FindManyQuery {
            select: Some(vec!["id".into(), "title".into()]),
            ..Default::default()
        };
        let stmt = select_rows("snippets", &query);
        assert_eq!(stmt.sql, "SELECT \"id\", \"title\" FROM \"snippets\"");
    }

    #[test]
    fn test_select_first_appends_limit() {
        let stmt = select_first("users", &[WhereClause::eq("id", "usr_1")]);
        assert_eq!(stmt.sql, "SELECT * FROM \"users\" WHERE \"id\" = $1 LIMIT 1");
        assert_eq!(stmt.params, vec![BindParam::Text("usr_1".into())]);
    }

    #[test]
    fn test_null_filter_binds_nothing() {
        let stmt = select_first("snippets", &[WhereClause::is_null("projectId")]);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"snippets\" WHERE \"projectId\" IS NULL LIMIT 1"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_ne_null_becomes_is_not_null() {
        let stmt = delete_rows("snippets", &[WhereClause::ne("tags", serde_json::Value::Null)]);
        assert_eq!(stmt.sql, "DELETE FROM \"snippets\" WHERE \"tags\" IS NOT NULL");
    }

    #[test]
    fn test_connectors_join_previous_clause() {
        let filter = vec![
            WhereClause::eq("userId", "usr_1").and(),
            WhereClause::eq("language", "rust").or(),
            WhereClause::eq("language", "go"),
        ];
        let stmt = delete_rows("snippets", &filter);
        assert_eq!(
            stmt.sql,
            "DELETE FROM \"snippets\" WHERE \"userId\" = $1 AND \"language\" = $2 OR \"language\" = $3"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_in_list() {
        let stmt = count_rows("community", &[WhereClause::is_in("id", json!(["a", "b", "c"]))]);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS total FROM \"community\" WHERE \"id\" IN ($1, $2, $3)"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_in_scalar_degrades_to_eq() {
        let stmt = count_rows("community", &[WhereClause::is_in("id", json!("com_1"))]);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS total FROM \"community\" WHERE \"id\" = $1"
        );
    }

    #[test]
    fn test_contains_wraps_needle() {
        let stmt = select_rows(
            "community",
            &FindManyQuery {
                where_clauses: vec![WhereClause::contains("title", "cache")],
                ..Default::default()
            },
        );
        assert_eq!(stmt.sql, "SELECT * FROM \"community\" WHERE \"title\" LIKE $1");
        assert_eq!(stmt.params, vec![BindParam::Text("%cache%".into())]);
    }

    #[test]
    fn test_order_and_window() {
        let query = FindManyQuery {
            sort_by: Some(SortBy {
                field: "createdAt".into(),
                direction: SortDirection::Desc,
            }),
            limit: Some(20),
            offset: Some(40),
            ..Default::default()
        };
        let stmt = select_rows("community", &query);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"community\" ORDER BY \"createdAt\" DESC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn test_offset_without_limit_stays_sqlite_legal() {
        let query = FindManyQuery {
            offset: Some(5),
            ..Default::default()
        };
        let stmt = select_rows("snippets", &query);
        assert_eq!(stmt.sql, "SELECT * FROM \"snippets\" LIMIT -1 OFFSET 5");
    }

    #[test]
    fn test_insert_row() {
        let row = fields(json!({"id": "snp_1", "title": "Debounce helper"}));
        let stmt = insert_row("snippets", &row);
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"snippets\" (\"id\", \"title\") VALUES ($1, $2)"
        );
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_update_numbering_continues_into_where() {
        let changes = fields(json!({"likesCount": 3, "title": "LRU cache"}));
        let stmt = update_rows("community", &[WhereClause::eq("id", "com_1")], &changes);
        assert_eq!(
            stmt.sql,
            "UPDATE \"community\" SET \"likesCount\" = $1, \"title\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(stmt.params[2], BindParam::Text("com_1".into()));
    }

    #[test]
    fn test_param_narrowing() {
        let row = fields(json!({
            "flag": true,
            "gone": null,
            "ratio": 0.5,
            "views": 7
        }));
        let stmt = insert_row("community", &row);
        assert_eq!(
            stmt.params,
            vec![
                BindParam::Int(1),
                BindParam::Null,
                BindParam::Float(0.5),
                BindParam::Int(7),
            ]
        );
    }

    #[test]
    fn test_quote_identifier_strips_embedded_quotes() {
        assert_eq!(quote_identifier("community_likes"), "\"community_likes\"");
        assert_eq!(quote_identifier("a\"b"), "\"ab\"");
    }
}
