// Schema DDL generation: translates AppSchema definitions into dialect-aware SQL.
//
// The migration planner (crate::migration) introspects the live database and
// calls into this module to produce CREATE TABLE / ALTER TABLE / CREATE INDEX
// statements for anything missing.

use sqlx::AnyPool;

use snipstash_core::db::adapter::{AdapterResult, SchemaOptions, SchemaStatus};
use snipstash_core::db::schema::{AppSchema, AppTable, FieldType, SchemaField};

use crate::migration::get_migrations_auto;
use crate::statement::quote_identifier;

/// Database backends distinguished by the DDL generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Sqlite,
    Postgres,
    Mysql,
}

/// Map a schema field type to a column type for the given backend.
///
/// Timestamps travel as RFC 3339 strings end to end, so `Date` maps to a
/// text column everywhere. Booleans are stored as 0/1 integers to match
/// how bind values are sent over the Any driver.
pub fn column_type(field_type: FieldType, db_type: DatabaseType) -> &'static str {
    match field_type {
        FieldType::String => match db_type {
            DatabaseType::Mysql => "varchar(255)",
            _ => "text",
        },
        FieldType::Number => "bigint",
        FieldType::Boolean => match db_type {
            DatabaseType::Mysql => "tinyint(1)",
            _ => "integer",
        },
        FieldType::Date => "text",
    }
}

/// Check whether an introspected column type satisfies the expected field type.
///
/// Comparison is lenient: each backend reports types with its own spelling
/// ("TEXT", "character varying", "INT8"), so we match on substrings.
pub fn match_type(actual: &str, expected: &FieldType, _db_type: DatabaseType) -> bool {
    let actual = actual.to_lowercase();
    match expected {
        FieldType::String => {
            actual.contains("text") || actual.contains("char") || actual.contains("clob")
        }
        FieldType::Number => {
            actual.contains("int")
                || actual.contains("numeric")
                || actual.contains("decimal")
                || actual.contains("real")
                || actual.contains("double")
                || actual.contains("float")
        }
        FieldType::Boolean => actual.contains("bool") || actual.contains("int"),
        FieldType::Date => {
            actual.contains("text")
                || actual.contains("char")
                || actual.contains("date")
                || actual.contains("time")
        }
    }
}

/// Render a default value as a SQL literal.
fn default_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Bool(b) => {
            if *b {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        _ => "NULL".to_string(),
    }
}

/// Generate the column definition for a single field.
fn generate_column_ddl(name: &str, field: &SchemaField, db_type: DatabaseType) -> String {
    let mut ddl = format!(
        "{} {}",
        quote_identifier(name),
        column_type(field.field_type, db_type)
    );

    // All primary keys are application-generated text ids.
    if name == "id" {
        ddl.push_str(" PRIMARY KEY NOT NULL");
        return ddl;
    }

    if field.required {
        ddl.push_str(" NOT NULL");
    }
    if field.unique {
        ddl.push_str(" UNIQUE");
    }
    if let Some(default) = &field.default_value {
        ddl.push_str(&format!(" DEFAULT {}", default_literal(default)));
    }
    if let Some(reference) = &field.references {
        ddl.push_str(&format!(
            " REFERENCES {} ({}) ON DELETE CASCADE",
            quote_identifier(&reference.table),
            quote_identifier(&reference.field)
        ));
    }

    ddl
}

/// Generate a CREATE TABLE statement for a single table.
///
/// The `id` column always comes first; remaining columns are emitted in
/// alphabetical order so the generated DDL is deterministic.
pub fn generate_table_ddl(table: &AppTable, db_type: DatabaseType) -> String {
    let mut names: Vec<&String> = table
        .fields
        .keys()
        .filter(|name| name.as_str() != "id")
        .collect();
    names.sort();

    let mut columns = Vec::new();
    if let Some(id_field) = table.fields.get("id") {
        columns.push(generate_column_ddl("id", id_field, db_type));
    }
    for name in names {
        columns.push(generate_column_ddl(
            name,
            &table.fields[name.as_str()],
            db_type,
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(&table.name),
        columns.join(", ")
    )
}

/// Generate CREATE TABLE statements for every table in the schema, in
/// dependency order.
pub fn generate_ddl_for(schema: &AppSchema, db_type: DatabaseType) -> Vec<String> {
    schema
        .ordered_tables()
        .into_iter()
        .map(|table| generate_table_ddl(table, db_type))
        .collect()
}

/// Generate an ALTER TABLE ... ADD COLUMN statement.
///
/// NOT NULL is emitted only together with a default: adding a non-nullable
/// column to a table that already has rows fails otherwise.
pub fn generate_alter_ddl(
    table: &str,
    field_name: &str,
    field: &SchemaField,
    db_type: DatabaseType,
) -> String {
    let mut ddl = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_identifier(table),
        quote_identifier(field_name),
        column_type(field.field_type, db_type)
    );
    if let Some(default) = &field.default_value {
        if field.required {
            ddl.push_str(" NOT NULL");
        }
        ddl.push_str(&format!(" DEFAULT {}", default_literal(default)));
    }
    if let Some(reference) = &field.references {
        ddl.push_str(&format!(
            " REFERENCES {} ({}) ON DELETE CASCADE",
            quote_identifier(&reference.table),
            quote_identifier(&reference.field)
        ));
    }
    ddl
}

/// Generate CREATE INDEX statements for one table's foreign key columns.
pub fn generate_table_indexes(table: &AppTable) -> Vec<String> {
    let mut names: Vec<&String> = table.fields.keys().collect();
    names.sort();

    names
        .into_iter()
        .filter(|name| table.fields[name.as_str()].references.is_some())
        .map(|name| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_identifier(&format!("idx_{}_{}", table.name, name)),
                quote_identifier(&table.name),
                quote_identifier(name)
            )
        })
        .collect()
}

/// Generate CREATE INDEX statements for every foreign key column in the
/// schema, in dependency order.
pub fn generate_index_ddl(schema: &AppSchema) -> Vec<String> {
    schema
        .ordered_tables()
        .into_iter()
        .flat_map(generate_table_indexes)
        .collect()
}

/// Join migration statements into a single executable script.
pub fn compile_migrations(statements: &[String]) -> String {
    let mut sql = statements.join(";\n\n");
    sql.push(';');
    sql
}

/// Ensure the database schema matches the given `AppSchema`.
///
/// Computes the migration plan; with `auto_migrate` set the plan is applied
/// immediately. Returns the statements that were (or still need to be) run.
pub async fn create_schema(
    pool: &AnyPool,
    schema: &AppSchema,
    options: &SchemaOptions,
) -> AdapterResult<SchemaStatus> {
    let plan = get_migrations_auto(pool, schema).await?;
    if !plan.has_pending() {
        return Ok(SchemaStatus::UpToDate);
    }
    if options.auto_migrate {
        plan.run(pool).await?;
    }
    Ok(SchemaStatus::NeedsMigration {
        statements: plan.statements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_sqlite() {
        assert_eq!(column_type(FieldType::String, DatabaseType::Sqlite), "text");
        assert_eq!(
            column_type(FieldType::Number, DatabaseType::Sqlite),
            "bigint"
        );
        assert_eq!(
            column_type(FieldType::Boolean, DatabaseType::Sqlite),
            "integer"
        );
        assert_eq!(column_type(FieldType::Date, DatabaseType::Sqlite), "text");
    }

    #[test]
    fn test_column_type_mysql() {
        assert_eq!(
            column_type(FieldType::String, DatabaseType::Mysql),
            "varchar(255)"
        );
        assert_eq!(
            column_type(FieldType::Boolean, DatabaseType::Mysql),
            "tinyint(1)"
        );
    }

    #[test]
    fn test_match_type_lenient() {
        assert!(match_type("TEXT", &FieldType::String, DatabaseType::Sqlite));
        assert!(match_type(
            "character varying",
            &FieldType::String,
            DatabaseType::Postgres
        ));
        assert!(match_type("INTEGER", &FieldType::Number, DatabaseType::Sqlite));
        assert!(match_type("bigint", &FieldType::Number, DatabaseType::Sqlite));
        assert!(match_type(
            "INTEGER",
            &FieldType::Boolean,
            DatabaseType::Sqlite
        ));
        assert!(match_type("TEXT", &FieldType::Date, DatabaseType::Sqlite));
        assert!(match_type(
            "timestamptz",
            &FieldType::Date,
            DatabaseType::Postgres
        ));
        assert!(!match_type("integer", &FieldType::String, DatabaseType::Sqlite));
    }

    #[test]
    fn test_generate_table_ddl_users() {
        let schema = AppSchema::app_schema();
        let users = &schema.tables["users"];
        let ddl = generate_table_ddl(users, DatabaseType::Sqlite);
        assert_eq!(
            ddl,
            "CREATE TABLE IF NOT EXISTS \"users\" (\
             \"id\" text PRIMARY KEY NOT NULL, \
             \"createdAt\" text NOT NULL, \
             \"email\" text NOT NULL UNIQUE, \
             \"name\" text NOT NULL, \
             \"updatedAt\" text NOT NULL)"
        );
    }

    #[test]
    fn test_generate_table_ddl_foreign_key() {
        let schema = AppSchema::app_schema();
        let projects = &schema.tables["projects"];
        let ddl = generate_table_ddl(projects, DatabaseType::Sqlite);
        assert!(ddl.contains(
            "\"userId\" text NOT NULL REFERENCES \"users\" (\"id\") ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_generate_table_ddl_defaults() {
        let schema = AppSchema::app_schema();
        let snippets = &schema.tables["snippets"];
        let ddl = generate_table_ddl(snippets, DatabaseType::Sqlite);
        assert!(ddl.contains("\"isPublic\" integer DEFAULT 0"));

        let subs = &schema.tables["user_subscriptions"];
        let subs_ddl = generate_table_ddl(subs, DatabaseType::Sqlite);
        assert!(subs_ddl.contains("\"planType\" text NOT NULL DEFAULT 'FREE'"));
        assert!(subs_ddl.contains("\"status\" text NOT NULL DEFAULT 'incomplete'"));
    }

    #[test]
    fn test_generate_table_ddl_counters() {
        let schema = AppSchema::app_schema();
        let community = &schema.tables["community"];
        let ddl = generate_table_ddl(community, DatabaseType::Sqlite);
        assert!(ddl.contains("\"likesCount\" bigint DEFAULT 0"));
        assert!(ddl.contains("\"viewsCount\" bigint DEFAULT 0"));
    }

    #[test]
    fn test_generate_ddl_for_ordering() {
        let schema = AppSchema::app_schema();
        let statements = generate_ddl_for(&schema, DatabaseType::Sqlite);
        assert_eq!(statements.len(), 6);
        // Referenced tables come before their referrers
        assert!(statements[0].contains("\"users\""));
        assert!(statements[1].contains("\"projects\""));
        assert!(statements[2].contains("\"snippets\""));
        assert!(statements[3].contains("\"community\""));
        assert!(statements[4].contains("\"community_likes\""));
        assert!(statements[5].contains("\"user_subscriptions\""));
    }

    #[test]
    fn test_generate_alter_ddl() {
        let field = SchemaField::optional_string();
        let ddl = generate_alter_ddl("snippets", "forkedFrom", &field, DatabaseType::Sqlite);
        assert_eq!(ddl, "ALTER TABLE \"snippets\" ADD COLUMN \"forkedFrom\" text");
    }

    #[test]
    fn test_generate_alter_ddl_with_default() {
        let field = SchemaField::required_string().with_default(serde_json::json!("FREE"));
        let ddl = generate_alter_ddl(
            "user_subscriptions",
            "planType",
            &field,
            DatabaseType::Sqlite,
        );
        assert_eq!(
            ddl,
            "ALTER TABLE \"user_subscriptions\" ADD COLUMN \"planType\" text NOT NULL DEFAULT 'FREE'"
        );
    }

    #[test]
    fn test_generate_index_ddl() {
        let schema = AppSchema::app_schema();
        let statements = generate_index_ddl(&schema);
        // One index per foreign key column
        assert_eq!(statements.len(), 5);
        assert!(statements.contains(&String::from(
            "CREATE INDEX IF NOT EXISTS \"idx_projects_userId\" ON \"projects\" (\"userId\")"
        )));
        assert!(statements.contains(&String::from(
            "CREATE INDEX IF NOT EXISTS \"idx_snippets_userId\" ON \"snippets\" (\"userId\")"
        )));
    }

    #[test]
    fn test_default_literal_escaping() {
        let field = SchemaField::required_string().with_default(serde_json::json!("it's"));
        let ddl = generate_alter_ddl("projects", "label", &field, DatabaseType::Sqlite);
        assert!(ddl.contains("DEFAULT 'it''s'"));
    }

    #[test]
    fn test_compile_migrations() {
        let statements = vec![
            "CREATE TABLE \"users\" (\"id\" text PRIMARY KEY NOT NULL)".to_string(),
            "ALTER TABLE \"users\" ADD COLUMN \"name\" text".to_string(),
        ];
        let compiled = compile_migrations(&statements);
        assert!(compiled.contains(";\n\n"));
        assert!(compiled.ends_with(';'));
    }
}
