// Differential migration planner.
//
// Introspects the live database into a table-to-columns map, walks the target
// `AppSchema` in dependency order, and emits exactly the DDL that is missing:
// ALTER TABLE ADD COLUMN for existing tables, CREATE TABLE plus indexes for
// absent ones. Columns whose reported type no longer satisfies the schema are
// collected as drift and logged, never rewritten.
//
// SQLite is introspected through sqlite_master and PRAGMA table_info;
// Postgres and MySQL share one information_schema query.

use std::collections::HashMap;

use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};

use snipstash_core::db::schema::{AppSchema, FieldType};
use snipstash_core::error::SnipstashError;

use crate::schema::{
    compile_migrations, generate_alter_ddl, generate_table_ddl, generate_table_indexes,
    match_type, DatabaseType,
};
use crate::statement::quote_identifier;

/// Table name to (column name to reported type), for the whole database.
pub type LiveTables = HashMap<String, HashMap<String, String>>;

/// A column whose live type no longer satisfies the schema.
#[derive(Debug, Clone)]
pub struct TypeDrift {
    pub table: String,
    pub column: String,
    pub expected: FieldType,
    pub reported: String,
}

/// What the live database is missing, with the DDL that fixes it.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Tables absent from the database, in dependency order.
    pub missing_tables: Vec<String>,
    /// Existing tables missing columns, as (table, column) pairs.
    pub missing_columns: Vec<(String, String)>,
    /// Columns present with an unexpected type. Warned about, never fixed.
    pub type_drift: Vec<TypeDrift>,
    /// The DDL statements, in run order: ALTERs, then CREATEs, then indexes.
    pub statements: Vec<String>,
}

impl MigrationPlan {
    /// Join the statements into one executable script. An empty plan still
    /// compiles to `;` so the output is always runnable.
    pub fn compile(&self) -> String {
        if self.statements.is_empty() {
            return ";".to_string();
        }
        compile_migrations(&self.statements)
    }

    pub fn has_pending(&self) -> bool {
        !self.missing_tables.is_empty() || !self.missing_columns.is_empty()
    }

    /// Apply every statement in order.
    pub async fn run(&self, pool: &AnyPool) -> Result<(), SnipstashError> {
        for stmt in &self.statements {
            tracing::debug!("[Migration] {stmt}");
            sqlx::query(stmt).execute(pool).await.map_err(|e| {
                SnipstashError::Database(format!("migration failed: {e}\nSQL: {stmt}"))
            })?;
        }
        Ok(())
    }
}

/// Work out which backend the pool talks to.
///
/// `AnyPool` never names its driver directly, but the Debug form of its
/// connect options spells it out.
pub fn detect_db_type(pool: &AnyPool) -> DatabaseType {
    let options = format!("{:?}", pool.connect_options()).to_lowercase();
    if options.contains("postgres") {
        DatabaseType::Postgres
    } else if options.contains("mysql") || options.contains("mariadb") {
        DatabaseType::Mysql
    } else {
        DatabaseType::Sqlite
    }
}

/// Diff the target schema against the live database.
pub async fn get_migrations(
    pool: &AnyPool,
    schema: &AppSchema,
    db_type: DatabaseType,
) -> Result<MigrationPlan, SnipstashError> {
    let live = introspect(pool, db_type).await?;

    let mut missing_tables = Vec::new();
    let mut missing_columns = Vec::new();
    let mut type_drift = Vec::new();
    let mut statements = Vec::new();
    let mut created = Vec::new();

    for table in schema.ordered_tables() {
        let Some(live_columns) = live.get(&table.name) else {
            missing_tables.push(table.name.clone());
            created.push(table);
            continue;
        };

        // Table exists: diff its columns. Names are sorted so the emitted
        // ALTERs are deterministic.
        let mut names: Vec<&String> = table.fields.keys().collect();
        names.sort();
        for name in names {
            let field = &table.fields[name.as_str()];
            match live_columns.get(name.as_str()) {
                None => {
                    statements.push(generate_alter_ddl(&table.name, name, field, db_type));
                    missing_columns.push((table.name.clone(), name.clone()));
                }
                Some(reported) if !match_type(reported, &field.field_type, db_type) => {
                    type_drift.push(TypeDrift {
                        table: table.name.clone(),
                        column: name.clone(),
                        expected: field.field_type,
                        reported: reported.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    // New tables come after the ALTERs, followed by their indexes.
    for table in &created {
        statements.push(generate_table_ddl(table, db_type));
    }
    for table in &created {
        statements.extend(generate_table_indexes(table));
    }

    for drift in &type_drift {
        tracing::warn!(
            "[Migration] column '{}.{}' reports type '{}', schema wants {:?}",
            drift.table,
            drift.column,
            drift.reported,
            drift.expected
        );
    }

    Ok(MigrationPlan {
        missing_tables,
        missing_columns,
        type_drift,
        statements,
    })
}

/// Diff against whichever backend the pool turns out to be.
pub async fn get_migrations_auto(
    pool: &AnyPool,
    schema: &AppSchema,
) -> Result<MigrationPlan, SnipstashError> {
    get_migrations(pool, schema, detect_db_type(pool)).await
}

/// Read every user table and its column types from the live database.
pub async fn introspect(
    pool: &AnyPool,
    db_type: DatabaseType,
) -> Result<LiveTables, SnipstashError> {
    match db_type {
        DatabaseType::Sqlite => introspect_sqlite(pool).await,
        DatabaseType::Postgres => introspect_postgres(pool).await,
        DatabaseType::Mysql => introspect_mysql(pool).await,
    }
}

fn introspect_err(err: sqlx::Error) -> SnipstashError {
    SnipstashError::Database(format!("introspection failed: {err}"))
}

async fn introspect_sqlite(pool: &AnyPool) -> Result<LiveTables, SnipstashError> {
    let tables = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )
    .fetch_all(pool)
    .await
    .map_err(introspect_err)?;

    let mut live = LiveTables::new();
    for row in &tables {
        let table: String = row.try_get("name").map_err(introspect_err)?;

        // PRAGMA takes no bind parameters; the name goes in quoted.
        let pragma = format!("PRAGMA table_info({})", quote_identifier(&table));
        let columns = sqlx::query(&pragma)
            .fetch_all(pool)
            .await
            .map_err(introspect_err)?;

        let mut reported = HashMap::new();
        for column in &columns {
            let name: String = column.try_get("name").map_err(introspect_err)?;
            let data_type: String = column.try_get("type").unwrap_or_default();
            reported.insert(name, data_type);
        }
        live.insert(table, reported);
    }
    Ok(live)
}

// Shared by Postgres and MySQL; both expose information_schema. The join
// keeps view columns out.
const INFORMATION_SCHEMA_COLUMNS: &str =
    "SELECT c.table_name AS table_name, c.column_name AS column_name, c.data_type AS data_type \
     FROM information_schema.columns c \
     JOIN information_schema.tables t \
       ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
     WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE' \
     ORDER BY c.table_name, c.ordinal_position";

fn collect_information_schema(rows: &[AnyRow]) -> LiveTables {
    let mut live = LiveTables::new();
    for row in rows {
        let table: String = row.try_get("table_name").unwrap_or_default();
        let column: String = row.try_get("column_name").unwrap_or_default();
        let data_type: String = row.try_get("data_type").unwrap_or_default();
        if table.is_empty() || column.is_empty() {
            continue;
        }
        live.entry(table).or_default().insert(column, data_type);
    }
    live
}

async fn introspect_postgres(pool: &AnyPool) -> Result<LiveTables, SnipstashError> {
    let namespace = postgres_namespace(pool).await;
    let rows = sqlx::query(INFORMATION_SCHEMA_COLUMNS)
        .bind(&namespace)
        .fetch_all(pool)
        .await
        .map_err(introspect_err)?;
    Ok(collect_information_schema(&rows))
}

/// First usable entry of the Postgres search_path, defaulting to `public`.
async fn postgres_namespace(pool: &AnyPool) -> String {
    let row = match sqlx::query("SHOW search_path").fetch_optional(pool).await {
        Ok(Some(row)) => row,
        _ => return "public".to_string(),
    };
    let path: String = row.try_get("search_path").unwrap_or_default();
    path.split(',')
        .map(|entry| entry.trim().trim_matches('"').trim_matches('\''))
        .find(|entry| !entry.is_empty() && !entry.starts_with('$'))
        .unwrap_or("public")
        .to_string()
}

async fn introspect_mysql(pool: &AnyPool) -> Result<LiveTables, SnipstashError> {
    let current = sqlx::query("SELECT DATABASE() AS schema_name")
        .fetch_optional(pool)
        .await
        .map_err(introspect_err)?;
    let schema_name = current
        .and_then(|row| row.try_get::<String, _>("schema_name").ok())
        .filter(|name| !name.is_empty());

    // No database selected on this connection; nothing to diff against.
    let Some(schema_name) = schema_name else {
        return Ok(LiveTables::new());
    };

    let rows = sqlx::query(INFORMATION_SCHEMA_COLUMNS)
        .bind(&schema_name)
        .fetch_all(pool)
        .await
        .map_err(introspect_err)?;
    Ok(collect_information_schema(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipstash_core::db::schema::{AppSchema, SchemaField};

    async fn sqlite_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("sqlite pool")
    }

    fn empty_plan() -> MigrationPlan {
        MigrationPlan {
            missing_tables: vec![],
            missing_columns: vec![],
            type_drift: vec![],
            statements: vec![],
        }
    }

    #[test]
    fn test_empty_plan_compiles_to_noop() {
        let plan = empty_plan();
        assert!(!plan.has_pending());
        assert_eq!(plan.compile(), ";");
    }

    #[test]
    fn test_compiled_script_terminates() {
        let plan = MigrationPlan {
            missing_columns: vec![
                ("users".into(), "avatarUrl".into()),
                ("snippets".into(), "forkedFrom".into()),
            ],
            statements: vec![
                "ALTER TABLE \"users\" ADD COLUMN \"avatarUrl\" text".to_string(),
                "ALTER TABLE \"snippets\" ADD COLUMN \"forkedFrom\" text".to_string(),
            ],
            ..empty_plan()
        };
        assert!(plan.has_pending());
        let compiled = plan.compile();
        assert!(compiled.contains("ALTER TABLE \"users\""));
        assert!(compiled.contains("ALTER TABLE \"snippets\""));
        assert!(compiled.ends_with(';'));
    }

    #[tokio::test]
    async fn test_fresh_database_needs_every_table() {
        let pool = sqlite_pool().await;
        let schema = AppSchema::app_schema();

        let plan = get_migrations(&pool, &schema, DatabaseType::Sqlite)
            .await
            .expect("plan");

        // Dependency order: referenced tables first.
        assert_eq!(
            plan.missing_tables,
            vec![
                "users",
                "projects",
                "snippets",
                "community",
                "community_likes",
                "user_subscriptions"
            ]
        );
        assert!(plan.missing_columns.is_empty());
        assert!(plan.type_drift.is_empty());
        assert!(plan.compile().contains("CREATE TABLE"));
    }

    #[tokio::test]
    async fn test_existing_table_is_not_recreated() {
        let pool = sqlite_pool().await;
        sqlx::query(
            r#"CREATE TABLE "users" (
                "id" TEXT PRIMARY KEY NOT NULL,
                "email" TEXT NOT NULL UNIQUE,
                "name" TEXT NOT NULL,
                "createdAt" TEXT NOT NULL,
                "updatedAt" TEXT NOT NULL
            )"#,
        )
        .execute(&pool)
        .await
        .expect("create users");

        let schema = AppSchema::app_schema();
        let plan = get_migrations(&pool, &schema, DatabaseType::Sqlite)
            .await
            .expect("plan");

        assert_eq!(plan.missing_tables.len(), 5);
        assert!(!plan.missing_tables.contains(&"users".to_string()));
        assert!(plan.missing_columns.is_empty());
    }

    #[tokio::test]
    async fn test_missing_column_becomes_alter() {
        let pool = sqlite_pool().await;
        // projects without its color column
        sqlx::query(
            r#"CREATE TABLE "projects" (
                "id" TEXT PRIMARY KEY NOT NULL,
                "userId" TEXT NOT NULL,
                "name" TEXT NOT NULL,
                "description" TEXT,
                "createdAt" TEXT NOT NULL,
                "updatedAt" TEXT NOT NULL
            )"#,
        )
        .execute(&pool)
        .await
        .expect("create projects");

        let schema = AppSchema::app_schema();
        let plan = get_migrations(&pool, &schema, DatabaseType::Sqlite)
            .await
            .expect("plan");

        assert_eq!(plan.missing_tables.len(), 5);
        assert_eq!(
            plan.missing_columns,
            vec![("projects".to_string(), "color".to_string())]
        );
        assert!(plan
            .statements
            .iter()
            .any(|s| s.starts_with("ALTER TABLE \"projects\" ADD COLUMN \"color\"")));
    }

    #[tokio::test]
    async fn test_type_drift_is_reported_not_fixed() {
        let pool = sqlite_pool().await;
        // createdAt stored as INTEGER where the schema wants a date string
        sqlx::query(
            r#"CREATE TABLE "community_likes" (
                "id" TEXT PRIMARY KEY NOT NULL,
                "communityId" TEXT NOT NULL,
                "userId" TEXT NOT NULL,
                "createdAt" INTEGER NOT NULL
            )"#,
        )
        .execute(&pool)
        .await
        .expect("create community_likes");

        let schema = AppSchema::app_schema();
        let plan = get_migrations(&pool, &schema, DatabaseType::Sqlite)
            .await
            .expect("plan");

        let drift = plan
            .type_drift
            .iter()
            .find(|d| d.table == "community_likes" && d.column == "createdAt")
            .expect("drift entry");
        assert_eq!(drift.expected, FieldType::Date);
        assert_eq!(drift.reported.to_uppercase(), "INTEGER");
        // Drift alone is not pending work.
        assert!(!plan.statements.iter().any(|s| s.contains("community_likes")));
    }

    #[tokio::test]
    async fn test_run_then_recheck_is_idempotent() {
        let pool = sqlite_pool().await;
        let schema = AppSchema::app_schema();

        let plan = get_migrations(&pool, &schema, DatabaseType::Sqlite)
            .await
            .expect("first plan");
        assert!(plan.has_pending());
        plan.run(&pool).await.expect("run");

        let recheck = get_migrations(&pool, &schema, DatabaseType::Sqlite)
            .await
            .expect("second plan");
        assert!(
            !recheck.has_pending(),
            "still pending: {:?} / {:?}",
            recheck.missing_tables,
            recheck.missing_columns
        );
        assert_eq!(recheck.compile(), ";");
    }

    #[tokio::test]
    async fn test_schema_growth_adds_columns() {
        let pool = sqlite_pool().await;

        let base = AppSchema::app_schema();
        let plan = get_migrations(&pool, &base, DatabaseType::Sqlite)
            .await
            .unwrap();
        plan.run(&pool).await.unwrap();

        // Grow the schema the way a later release would.
        let mut grown = AppSchema::app_schema();
        if let Some(users) = grown.tables.get_mut("users") {
            users
                .fields
                .insert("avatarUrl".to_string(), SchemaField::optional_string());
        }
        if let Some(snippets) = grown.tables.get_mut("snippets") {
            snippets
                .fields
                .insert("forkedFrom".to_string(), SchemaField::optional_string());
        }

        let diff = get_migrations(&pool, &grown, DatabaseType::Sqlite)
            .await
            .unwrap();
        assert!(diff.missing_tables.is_empty());
        assert!(diff
            .missing_columns
            .contains(&("users".to_string(), "avatarUrl".to_string())));
        assert!(diff
            .missing_columns
            .contains(&("snippets".to_string(), "forkedFrom".to_string())));

        diff.run(&pool).await.unwrap();

        let settled = get_migrations(&pool, &grown, DatabaseType::Sqlite)
            .await
            .unwrap();
        assert!(!settled.has_pending());
    }
}
