// Table-definition DSL.
//
// The application schema is declared as data: tables, fields, defaults,
// references. SQL backends turn it into dialect-specific DDL; the in-memory
// backend only needs the table names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Storage-level type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
}

/// Foreign key target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldReference {
    pub table: String,
    pub field: String,
}

/// One column in a table declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub field_type: FieldType,
    /// Non-nullable when set.
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    /// Auto-set to the current timestamp when a row is created.
    #[serde(default)]
    pub auto_set_on_create: bool,
    /// Auto-set to the current timestamp when a row is updated.
    #[serde(default)]
    pub auto_set_on_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<FieldReference>,
}

impl SchemaField {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            unique: false,
            default_value: None,
            auto_set_on_create: false,
            auto_set_on_update: false,
            references: None,
        }
    }

    pub fn required_string() -> Self {
        Self {
            required: true,
            ..Self::of(FieldType::String)
        }
    }

    pub fn optional_string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn optional_date() -> Self {
        Self::of(FieldType::Date)
    }

    /// Boolean column with a declared default.
    pub fn boolean(default: bool) -> Self {
        Self {
            default_value: Some(serde_json::Value::Bool(default)),
            ..Self::of(FieldType::Boolean)
        }
    }

    /// Integer column with a declared default. Counters use this.
    pub fn integer(default: i64) -> Self {
        Self {
            default_value: Some(serde_json::Value::from(default)),
            ..Self::of(FieldType::Number)
        }
    }

    pub fn created_at() -> Self {
        Self {
            required: true,
            auto_set_on_create: true,
            ..Self::of(FieldType::Date)
        }
    }

    pub fn updated_at() -> Self {
        Self {
            auto_set_on_update: true,
            ..Self::created_at()
        }
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_reference(mut self, table: &str, field: &str) -> Self {
        self.references = Some(FieldReference {
            table: table.to_string(),
            field: field.to_string(),
        });
        self
    }
}

/// One table declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppTable {
    pub name: String,
    /// Field name → definition. Names are the camelCase identifiers used in
    /// transit, and double as the physical column names.
    pub fields: HashMap<String, SchemaField>,
    /// Creation order. Referenced tables must sort before their referrers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
}

impl AppTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: HashMap::new(),
            order: None,
        }
    }

    pub fn field(mut self, name: &str, definition: SchemaField) -> Self {
        self.fields.insert(name.to_string(), definition);
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Every table the application declares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSchema {
    pub tables: HashMap<String, AppTable>,
}

impl AppSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: AppTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Tables sorted by declared order, then name. DDL generation walks
    /// this so references resolve.
    pub fn ordered_tables(&self) -> Vec<&AppTable> {
        let mut tables: Vec<&AppTable> = self.tables.values().collect();
        tables.sort_by_key(|t| (t.order.unwrap_or(i32::MAX), t.name.clone()));
        tables
    }

    /// The full application schema.
    ///
    /// Column identifiers are the camelCase field names used in transit;
    /// table names are snake_case. `projectId` on snippets carries no
    /// foreign key: deleting a project leaves its snippets in place with a
    /// dangling reference, and community cleanup happens in application
    /// logic inside the same transaction as the triggering write.
    pub fn app_schema() -> Self {
        let users = AppTable::new("users")
            .with_order(1)
            .field("id", SchemaField::required_string())
            .field("email", SchemaField::required_string().with_unique())
            .field("name", SchemaField::required_string())
            .field("createdAt", SchemaField::created_at())
            .field("updatedAt", SchemaField::updated_at());

        let projects = AppTable::new("projects")
            .with_order(2)
            .field("id", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string().with_reference("users", "id"),
            )
            .field("name", SchemaField::required_string())
            .field("description", SchemaField::optional_string())
            .field("color", SchemaField::optional_string())
            .field("createdAt", SchemaField::created_at())
            .field("updatedAt", SchemaField::updated_at());

        let snippets = AppTable::new("snippets")
            .with_order(3)
            .field("id", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string().with_reference("users", "id"),
            )
            .field("projectId", SchemaField::optional_string())
            .field("title", SchemaField::required_string())
            .field("code", SchemaField::required_string())
            .field("language", SchemaField::required_string())
            .field("tags", SchemaField::optional_string())
            .field("isPublic", SchemaField::boolean(false))
            .field("createdAt", SchemaField::created_at())
            .field("updatedAt", SchemaField::updated_at());

        let community = AppTable::new("community")
            .with_order(4)
            .field("id", SchemaField::required_string())
            .field("snippetId", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string().with_reference("users", "id"),
            )
            .field("projectId", SchemaField::optional_string())
            .field("title", SchemaField::required_string())
            .field("code", SchemaField::required_string())
            .field("language", SchemaField::required_string())
            .field("tags", SchemaField::optional_string())
            .field("likesCount", SchemaField::integer(0))
            .field("viewsCount", SchemaField::integer(0))
            .field("createdAt", SchemaField::created_at())
            .field("updatedAt", SchemaField::updated_at());

        let community_likes = AppTable::new("community_likes")
            .with_order(5)
            .field("id", SchemaField::required_string())
            .field("communityId", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string().with_reference("users", "id"),
            )
            .field("createdAt", SchemaField::created_at());

        let user_subscriptions = AppTable::new("user_subscriptions")
            .with_order(6)
            .field("id", SchemaField::required_string())
            .field(
                "userId",
                SchemaField::required_string()
                    .with_unique()
                    .with_reference("users", "id"),
            )
            .field("stripeCustomerId", SchemaField::optional_string())
            .field("stripeSubscriptionId", SchemaField::optional_string())
            .field(
                "planType",
                SchemaField::required_string().with_default(serde_json::json!("FREE")),
            )
            .field(
                "status",
                SchemaField::required_string().with_default(serde_json::json!("incomplete")),
            )
            .field("currentPeriodStart", SchemaField::optional_date())
            .field("currentPeriodEnd", SchemaField::optional_date())
            .field("cancelAtPeriodEnd", SchemaField::boolean(false))
            .field("createdAt", SchemaField::created_at())
            .field("updatedAt", SchemaField::updated_at());

        Self::new()
            .table(users)
            .table(projects)
            .table(snippets)
            .table(community)
            .table(community_likes)
            .table(user_subscriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_all_tables_in_dependency_order() {
        let schema = AppSchema::app_schema();
        let names: Vec<&str> = schema
            .ordered_tables()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "users",
                "projects",
                "snippets",
                "community",
                "community_likes",
                "user_subscriptions"
            ]
        );
    }

    #[test]
    fn test_counters_declare_integer_defaults() {
        let schema = AppSchema::app_schema();
        let community = &schema.tables["community"];
        for counter in ["likesCount", "viewsCount"] {
            let field = &community.fields[counter];
            assert_eq!(field.field_type, FieldType::Number);
            assert_eq!(field.default_value, Some(serde_json::json!(0)));
        }
    }

    #[test]
    fn test_email_unique_and_project_reference_nullable() {
        let schema = AppSchema::app_schema();
        assert!(schema.tables["users"].fields["email"].unique);
        assert!(!schema.tables["snippets"].fields["projectId"].required);
        assert!(schema.tables["snippets"].fields["projectId"].references.is_none());
    }

    #[test]
    fn test_updated_at_auto_sets_both_ways() {
        let field = SchemaField::updated_at();
        assert!(field.required);
        assert!(field.auto_set_on_create);
        assert!(field.auto_set_on_update);
    }
}
