// Typed store over the raw `Adapter` trait.
//
// The adapters speak `serde_json::Value`; this layer owns the table names,
// converts rows to the typed records, and normalizes the storage quirks that
// the SQL backends introduce (booleans round-trip as 0/1 integers, tag lists
// are stored as JSON text so every backend can filter them the same way).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use snipstash_billing::types::UserSubscription;
use snipstash_billing::webhook::parse_subscription_status;
use snipstash_core::db::adapter::{
    Adapter, Connector, FindManyQuery, SortBy, TransactionAdapter, WhereClause,
};
use snipstash_core::db::models::{CommunityPost, Project, Snippet, UserRecord};
use snipstash_core::plan::PlanType;
use snipstash_core::SnipstashError;

/// Bucket key for snippets that belong to no project.
///
/// Snippets created without a project all count against this one shared
/// bucket for quota purposes, and list filters accept it as a project id.
pub const NO_PROJECT_BUCKET: &str = "no-project";

/// Errors from the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found")]
    NotFound,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<SnipstashError> for StoreError {
    fn from(e: SnipstashError) -> Self {
        Self::Database(e.to_string())
    }
}

/// Filters for listing a user's snippets. All fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct SnippetFilter {
    /// Restrict to one project, or to the unfiled bucket with
    /// [`NO_PROJECT_BUCKET`].
    pub project_id: Option<String>,
    pub language: Option<String>,
    /// Free-text substring match on titles.
    pub q: Option<String>,
    /// Whole-tag membership.
    pub tag: Option<String>,
}

/// The typed store trait — high-level database operations.
///
/// Wraps a raw [`Adapter`] and provides application-specific methods per
/// entity. Multi-row mutations (visibility sync, like toggles, snippet
/// deletion) go through [`Store::begin`] and work on the transaction's raw
/// adapter directly.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── User Operations ─────────────────────────────────────────

    /// Find a mirrored user by their external id.
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Create a mirrored user row.
    async fn create_user(&self, user: &UserRecord) -> Result<UserRecord, StoreError>;

    /// Update user fields by id.
    async fn update_user(&self, id: &str, data: Value) -> Result<UserRecord, StoreError>;

    // ─── Project Operations ──────────────────────────────────────

    async fn create_project(&self, project: &Project) -> Result<Project, StoreError>;

    /// Find a project owned by the given user. A project belonging to someone
    /// else is treated as not found.
    async fn find_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<Project>, StoreError>;

    /// List a user's projects, newest first.
    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError>;

    async fn update_project(&self, project_id: &str, data: Value) -> Result<Project, StoreError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), StoreError>;

    /// Count a user's projects (quota input).
    async fn count_projects(&self, user_id: &str) -> Result<i64, StoreError>;

    // ─── Snippet Operations ──────────────────────────────────────

    async fn create_snippet(&self, snippet: &Snippet) -> Result<Snippet, StoreError>;

    async fn find_snippet(&self, snippet_id: &str) -> Result<Option<Snippet>, StoreError>;

    /// List a user's snippets with optional filters, newest first.
    async fn list_snippets(
        &self,
        user_id: &str,
        filter: &SnippetFilter,
    ) -> Result<Vec<Snippet>, StoreError>;

    async fn update_snippet(&self, snippet_id: &str, data: Value) -> Result<Snippet, StoreError>;

    /// Count a user's snippets in one quota bucket: a project's snippets, or
    /// the unfiled ones when `project_id` is `None`.
    async fn count_snippets_in_bucket(
        &self,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<i64, StoreError>;

    // ─── Community Operations ────────────────────────────────────

    async fn find_post(&self, post_id: &str) -> Result<Option<CommunityPost>, StoreError>;

    /// Find the community projection of a snippet, if it is published.
    async fn find_post_by_snippet(
        &self,
        snippet_id: &str,
    ) -> Result<Option<CommunityPost>, StoreError>;

    /// List the public feed, newest first.
    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<CommunityPost>, StoreError>;

    async fn update_post(&self, post_id: &str, data: Value) -> Result<CommunityPost, StoreError>;

    // ─── Subscription Operations ─────────────────────────────────

    async fn find_subscription_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError>;

    async fn find_subscription_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError>;

    /// Find a subscription by the payment provider's subscription id.
    async fn find_subscription_by_provider_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError>;

    async fn create_subscription(
        &self,
        subscription: &UserSubscription,
    ) -> Result<UserSubscription, StoreError>;

    /// Update a subscription row by its row id.
    async fn update_subscription(
        &self,
        id: &str,
        data: Value,
    ) -> Result<UserSubscription, StoreError>;

    // ─── Transactions ────────────────────────────────────────────

    /// Begin a transaction on the underlying adapter.
    async fn begin(&self) -> Result<Box<dyn TransactionAdapter>, StoreError>;
}

// ─── Concrete Implementation ────────────────────────────────────

/// Concrete store backed by a raw [`Adapter`] (SQLx, in-memory).
pub struct ConcreteStore {
    adapter: Arc<dyn Adapter>,
}

impl ConcreteStore {
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }
}

/// Join clauses with AND: every clause except the last gets the connector.
fn all_of(mut clauses: Vec<WhereClause>) -> Vec<WhereClause> {
    let len = clauses.len();
    for clause in clauses.iter_mut().take(len.saturating_sub(1)) {
        clause.connector = Some(Connector::And);
    }
    clauses
}

fn newest_first() -> Option<SortBy> {
    Some(SortBy::desc("createdAt"))
}

#[async_trait]
impl Store for ConcreteStore {
    // ─── User Operations ─────────────────────────────────────────

    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = self
            .adapter
            .find_one("users", &[WhereClause::eq("id", id)])
            .await?;
        row.map(|r| parse_user(&r)).transpose()
    }

    async fn create_user(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
        let row = serde_json::to_value(user)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let created = self.adapter.create("users", row, None).await?;
        parse_user(&created)
    }

    async fn update_user(&self, id: &str, data: Value) -> Result<UserRecord, StoreError> {
        let updated = self
            .adapter
            .update("users", &[WhereClause::eq("id", id)], data)
            .await?
            .ok_or(StoreError::NotFound)?;
        parse_user(&updated)
    }

    // ─── Project Operations ──────────────────────────────────────

    async fn create_project(&self, project: &Project) -> Result<Project, StoreError> {
        let row = serde_json::to_value(project)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let created = self.adapter.create("projects", row, None).await?;
        parse_project(&created)
    }

    async fn find_project(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Option<Project>, StoreError> {
        let row = self
            .adapter
            .find_one(
                "projects",
                &[
                    WhereClause::eq("id", project_id).and(),
                    WhereClause::eq("userId", user_id),
                ],
            )
            .await?;
        row.map(|r| parse_project(&r)).transpose()
    }

    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "projects",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("userId", user_id)],
                    sort_by: newest_first(),
                    ..Default::default()
                },
            )
            .await?;
        rows.iter().map(parse_project).collect()
    }

    async fn update_project(&self, project_id: &str, data: Value) -> Result<Project, StoreError> {
        let updated = self
            .adapter
            .update("projects", &[WhereClause::eq("id", project_id)], data)
            .await?
            .ok_or(StoreError::NotFound)?;
        parse_project(&updated)
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StoreError> {
        self.adapter
            .delete("projects", &[WhereClause::eq("id", project_id)])
            .await
            .map_err(Into::into)
    }

    async fn count_projects(&self, user_id: &str) -> Result<i64, StoreError> {
        self.adapter
            .count("projects", &[WhereClause::eq("userId", user_id)])
            .await
            .map_err(Into::into)
    }

    // ─── Snippet Operations ──────────────────────────────────────

    async fn create_snippet(&self, snippet: &Snippet) -> Result<Snippet, StoreError> {
        let created = self
            .adapter
            .create("snippets", snippet_row(snippet)?, None)
            .await?;
        parse_snippet(&created)
    }

    async fn find_snippet(&self, snippet_id: &str) -> Result<Option<Snippet>, StoreError> {
        let row = self
            .adapter
            .find_one("snippets", &[WhereClause::eq("id", snippet_id)])
            .await?;
        row.map(|r| parse_snippet(&r)).transpose()
    }

    async fn list_snippets(
        &self,
        user_id: &str,
        filter: &SnippetFilter,
    ) -> Result<Vec<Snippet>, StoreError> {
        let mut clauses = vec![WhereClause::eq("userId", user_id)];

        if let Some(project) = &filter.project_id {
            if project == NO_PROJECT_BUCKET {
                clauses.push(WhereClause::is_null("projectId"));
            } else {
                clauses.push(WhereClause::eq("projectId", project.as_str()));
            }
        }
        if let Some(language) = &filter.language {
            clauses.push(WhereClause::eq("language", language.as_str()));
        }
        if let Some(q) = &filter.q {
            clauses.push(WhereClause::contains("title", q.as_str()));
        }
        if let Some(tag) = &filter.tag {
            // Tags are stored as JSON text, so matching the quoted needle
            // turns a substring search into whole-tag membership.
            clauses.push(WhereClause::contains("tags", format!("\"{}\"", tag)));
        }

        let rows = self
            .adapter
            .find_many(
                "snippets",
                FindManyQuery {
                    where_clauses: all_of(clauses),
                    sort_by: newest_first(),
                    ..Default::default()
                },
            )
            .await?;
        rows.iter().map(parse_snippet).collect()
    }

    async fn update_snippet(&self, snippet_id: &str, data: Value) -> Result<Snippet, StoreError> {
        let updated = self
            .adapter
            .update("snippets", &[WhereClause::eq("id", snippet_id)], data)
            .await?
            .ok_or(StoreError::NotFound)?;
        parse_snippet(&updated)
    }

    async fn count_snippets_in_bucket(
        &self,
        user_id: &str,
        project_id: Option<&str>,
    ) -> Result<i64, StoreError> {
        let bucket = match project_id {
            Some(id) => WhereClause::eq("projectId", id),
            None => WhereClause::is_null("projectId"),
        };
        self.adapter
            .count(
                "snippets",
                &[WhereClause::eq("userId", user_id).and(), bucket],
            )
            .await
            .map_err(Into::into)
    }

    // ─── Community Operations ────────────────────────────────────

    async fn find_post(&self, post_id: &str) -> Result<Option<CommunityPost>, StoreError> {
        let row = self
            .adapter
            .find_one("community", &[WhereClause::eq("id", post_id)])
            .await?;
        row.map(|r| parse_post(&r)).transpose()
    }

    async fn find_post_by_snippet(
        &self,
        snippet_id: &str,
    ) -> Result<Option<CommunityPost>, StoreError> {
        let row = self
            .adapter
            .find_one("community", &[WhereClause::eq("snippetId", snippet_id)])
            .await?;
        row.map(|r| parse_post(&r)).transpose()
    }

    async fn list_posts(&self, limit: i64, offset: i64) -> Result<Vec<CommunityPost>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "community",
                FindManyQuery {
                    where_clauses: vec![],
                    limit: Some(limit),
                    offset: Some(offset),
                    sort_by: newest_first(),
                    ..Default::default()
                },
            )
            .await?;
        rows.iter().map(parse_post).collect()
    }

    async fn update_post(&self, post_id: &str, data: Value) -> Result<CommunityPost, StoreError> {
        let updated = self
            .adapter
            .update("community", &[WhereClause::eq("id", post_id)], data)
            .await?
            .ok_or(StoreError::NotFound)?;
        parse_post(&updated)
    }

    // ─── Subscription Operations ─────────────────────────────────

    async fn find_subscription_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError> {
        let row = self
            .adapter
            .find_one("user_subscriptions", &[WhereClause::eq("userId", user_id)])
            .await?;
        row.map(|r| parse_subscription(&r)).transpose()
    }

    async fn find_subscription_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError> {
        let row = self
            .adapter
            .find_one(
                "user_subscriptions",
                &[WhereClause::eq("stripeCustomerId", customer_id)],
            )
            .await?;
        row.map(|r| parse_subscription(&r)).transpose()
    }

    async fn find_subscription_by_provider_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<UserSubscription>, StoreError> {
        let row = self
            .adapter
            .find_one(
                "user_subscriptions",
                &[WhereClause::eq("stripeSubscriptionId", subscription_id)],
            )
            .await?;
        row.map(|r| parse_subscription(&r)).transpose()
    }

    async fn create_subscription(
        &self,
        subscription: &UserSubscription,
    ) -> Result<UserSubscription, StoreError> {
        let row = serde_json::to_value(subscription)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let created = self.adapter.create("user_subscriptions", row, None).await?;
        parse_subscription(&created)
    }

    async fn update_subscription(
        &self,
        id: &str,
        data: Value,
    ) -> Result<UserSubscription, StoreError> {
        let updated = self
            .adapter
            .update("user_subscriptions", &[WhereClause::eq("id", id)], data)
            .await?
            .ok_or(StoreError::NotFound)?;
        parse_subscription(&updated)
    }

    // ─── Transactions ────────────────────────────────────────────

    async fn begin(&self) -> Result<Box<dyn TransactionAdapter>, StoreError> {
        self.adapter.begin_transaction().await.map_err(Into::into)
    }
}

// ─── Row Building ───────────────────────────────────────────────

/// Serialize a snippet for storage, with the tag list as JSON text.
pub fn snippet_row(snippet: &Snippet) -> Result<Value, StoreError> {
    let mut row =
        serde_json::to_value(snippet).map_err(|e| StoreError::Serialization(e.to_string()))?;
    row["tags"] = Value::String(tags_to_text(&snippet.tags)?);
    Ok(row)
}

/// Serialize a community post for storage, with the tag list as JSON text.
pub fn post_row(post: &CommunityPost) -> Result<Value, StoreError> {
    let mut row =
        serde_json::to_value(post).map_err(|e| StoreError::Serialization(e.to_string()))?;
    row["tags"] = Value::String(tags_to_text(&post.tags)?);
    Ok(row)
}

fn tags_to_text(tags: &[String]) -> Result<String, StoreError> {
    serde_json::to_string(tags).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ─── Row Parsing ────────────────────────────────────────────────

fn parse_user(value: &Value) -> Result<UserRecord, StoreError> {
    Ok(UserRecord {
        id: require_str(value, "id", "user")?,
        email: value["email"].as_str().unwrap_or_default().to_string(),
        name: value["name"].as_str().unwrap_or_default().to_string(),
        created_at: value["createdAt"].as_str().unwrap_or_default().to_string(),
        updated_at: value["updatedAt"].as_str().unwrap_or_default().to_string(),
    })
}

fn parse_project(value: &Value) -> Result<Project, StoreError> {
    Ok(Project {
        id: require_str(value, "id", "project")?,
        user_id: value["userId"].as_str().unwrap_or_default().to_string(),
        name: value["name"].as_str().unwrap_or_default().to_string(),
        description: opt_string(value, "description"),
        color: opt_string(value, "color"),
        created_at: value["createdAt"].as_str().unwrap_or_default().to_string(),
        updated_at: value["updatedAt"].as_str().unwrap_or_default().to_string(),
    })
}

pub(crate) fn parse_snippet(value: &Value) -> Result<Snippet, StoreError> {
    Ok(Snippet {
        id: require_str(value, "id", "snippet")?,
        user_id: value["userId"].as_str().unwrap_or_default().to_string(),
        project_id: opt_string(value, "projectId"),
        title: value["title"].as_str().unwrap_or_default().to_string(),
        code: value["code"].as_str().unwrap_or_default().to_string(),
        language: value["language"].as_str().unwrap_or_default().to_string(),
        tags: parse_tags(&value["tags"]),
        is_public: parse_bool(&value["isPublic"]),
        created_at: value["createdAt"].as_str().unwrap_or_default().to_string(),
        updated_at: value["updatedAt"].as_str().unwrap_or_default().to_string(),
    })
}

pub(crate) fn parse_post(value: &Value) -> Result<CommunityPost, StoreError> {
    Ok(CommunityPost {
        id: require_str(value, "id", "community post")?,
        snippet_id: value["snippetId"].as_str().unwrap_or_default().to_string(),
        user_id: value["userId"].as_str().unwrap_or_default().to_string(),
        project_id: opt_string(value, "projectId"),
        title: value["title"].as_str().unwrap_or_default().to_string(),
        code: value["code"].as_str().unwrap_or_default().to_string(),
        language: value["language"].as_str().unwrap_or_default().to_string(),
        tags: parse_tags(&value["tags"]),
        likes_count: parse_i64(&value["likesCount"]),
        views_count: parse_i64(&value["viewsCount"]),
        created_at: value["createdAt"].as_str().unwrap_or_default().to_string(),
        updated_at: value["updatedAt"].as_str().unwrap_or_default().to_string(),
    })
}

fn parse_subscription(value: &Value) -> Result<UserSubscription, StoreError> {
    let plan_type = value["planType"]
        .as_str()
        .and_then(PlanType::from_str)
        .unwrap_or_default();
    Ok(UserSubscription {
        id: require_str(value, "id", "subscription")?,
        user_id: value["userId"].as_str().unwrap_or_default().to_string(),
        stripe_customer_id: opt_string(value, "stripeCustomerId"),
        stripe_subscription_id: opt_string(value, "stripeSubscriptionId"),
        plan_type,
        status: parse_subscription_status(value["status"].as_str().unwrap_or_default()),
        current_period_start: opt_string(value, "currentPeriodStart"),
        current_period_end: opt_string(value, "currentPeriodEnd"),
        cancel_at_period_end: parse_bool(&value["cancelAtPeriodEnd"]),
        created_at: value["createdAt"].as_str().unwrap_or_default().to_string(),
        updated_at: value["updatedAt"].as_str().unwrap_or_default().to_string(),
    })
}

fn require_str(value: &Value, field: &str, entity: &str) -> Result<String, StoreError> {
    value[field]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::Serialization(format!("Missing {} {}", entity, field)))
}

fn opt_string(value: &Value, field: &str) -> Option<String> {
    value[field].as_str().map(|s| s.to_string())
}

/// Tags normally arrive as the JSON text this layer wrote; a real array is
/// accepted too so hand-seeded rows parse.
pub(crate) fn parse_tags(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => serde_json::from_str(text).unwrap_or_default(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Booleans come back as real booleans from the memory adapter and as 0/1
/// integers through the sqlx Any driver.
pub(crate) fn parse_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

pub(crate) fn parse_i64(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(0)
}

// ─── Test Utilities ──────────────────────────────────────────────

#[cfg(test)]
pub mod tests {
    use std::collections::HashMap;

    use super::*;

    /// Canned-response store for handler tests that don't need persistence.
    #[derive(Default)]
    pub struct MockStore {
        pub project_count: i64,
        /// Snippet counts per bucket, keyed by project id (`None` = unfiled).
        pub bucket_counts: HashMap<Option<String>, i64>,
        pub subscription: Option<UserSubscription>,
    }

    #[async_trait]
    impl Store for MockStore {
        async fn find_user(&self, _id: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(None)
        }
        async fn create_user(&self, user: &UserRecord) -> Result<UserRecord, StoreError> {
            Ok(user.clone())
        }
        async fn update_user(&self, _id: &str, _data: Value) -> Result<UserRecord, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn create_project(&self, project: &Project) -> Result<Project, StoreError> {
            Ok(project.clone())
        }
        async fn find_project(
            &self,
            _user_id: &str,
            _project_id: &str,
        ) -> Result<Option<Project>, StoreError> {
            Ok(None)
        }
        async fn list_projects(&self, _user_id: &str) -> Result<Vec<Project>, StoreError> {
            Ok(vec![])
        }
        async fn update_project(
            &self,
            _project_id: &str,
            _data: Value,
        ) -> Result<Project, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn delete_project(&self, _project_id: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn count_projects(&self, _user_id: &str) -> Result<i64, StoreError> {
            Ok(self.project_count)
        }
        async fn create_snippet(&self, snippet: &Snippet) -> Result<Snippet, StoreError> {
            Ok(snippet.clone())
        }
        async fn find_snippet(&self, _snippet_id: &str) -> Result<Option<Snippet>, StoreError> {
            Ok(None)
        }
        async fn list_snippets(
            &self,
            _user_id: &str,
            _filter: &SnippetFilter,
        ) -> Result<Vec<Snippet>, StoreError> {
            Ok(vec![])
        }
        async fn update_snippet(
            &self,
            _snippet_id: &str,
            _data: Value,
        ) -> Result<Snippet, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn count_snippets_in_bucket(
            &self,
            _user_id: &str,
            project_id: Option<&str>,
        ) -> Result<i64, StoreError> {
            Ok(self
                .bucket_counts
                .get(&project_id.map(|s| s.to_string()))
                .copied()
                .unwrap_or(0))
        }
        async fn find_post(&self, _post_id: &str) -> Result<Option<CommunityPost>, StoreError> {
            Ok(None)
        }
        async fn find_post_by_snippet(
            &self,
            _snippet_id: &str,
        ) -> Result<Option<CommunityPost>, StoreError> {
            Ok(None)
        }
        async fn list_posts(
            &self,
            _limit: i64,
            _offset: i64,
        ) -> Result<Vec<CommunityPost>, StoreError> {
            Ok(vec![])
        }
        async fn update_post(
            &self,
            _post_id: &str,
            _data: Value,
        ) -> Result<CommunityPost, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn find_subscription_by_user(
            &self,
            _user_id: &str,
        ) -> Result<Option<UserSubscription>, StoreError> {
            Ok(self.subscription.clone())
        }
        async fn find_subscription_by_customer(
            &self,
            _customer_id: &str,
        ) -> Result<Option<UserSubscription>, StoreError> {
            Ok(None)
        }
        async fn find_subscription_by_provider_id(
            &self,
            _subscription_id: &str,
        ) -> Result<Option<UserSubscription>, StoreError> {
            Ok(None)
        }
        async fn create_subscription(
            &self,
            subscription: &UserSubscription,
        ) -> Result<UserSubscription, StoreError> {
            Ok(subscription.clone())
        }
        async fn update_subscription(
            &self,
            _id: &str,
            _data: Value,
        ) -> Result<UserSubscription, StoreError> {
            Err(StoreError::NotFound)
        }
        async fn begin(&self) -> Result<Box<dyn TransactionAdapter>, StoreError> {
            Err(StoreError::Database(
                "transactions are not available in the mock store".to_string(),
            ))
        }
    }

    #[test]
    fn test_parse_tags_from_json_text() {
        let value = Value::String("[\"util\",\"web\"]".to_string());
        assert_eq!(parse_tags(&value), vec!["util", "web"]);
    }

    #[test]
    fn test_parse_tags_from_array() {
        let value = serde_json::json!(["rust", "async"]);
        assert_eq!(parse_tags(&value), vec!["rust", "async"]);
    }

    #[test]
    fn test_parse_tags_garbage_is_empty() {
        assert!(parse_tags(&Value::String("not json".into())).is_empty());
        assert!(parse_tags(&Value::Null).is_empty());
    }

    #[test]
    fn test_parse_bool_accepts_integers() {
        assert!(parse_bool(&serde_json::json!(true)));
        assert!(parse_bool(&serde_json::json!(1)));
        assert!(!parse_bool(&serde_json::json!(0)));
        assert!(!parse_bool(&Value::Null));
    }

    #[test]
    fn test_snippet_row_stores_tags_as_text() {
        let snippet = Snippet {
            id: "snip_1".into(),
            user_id: "usr_1".into(),
            project_id: None,
            title: "Debounce".into(),
            code: "fn debounce() {}".into(),
            language: "rust".into(),
            tags: vec!["util".into(), "timing".into()],
            is_public: false,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        };
        let row = snippet_row(&snippet).expect("serialize snippet");
        assert_eq!(row["tags"], Value::String("[\"util\",\"timing\"]".into()));
        // Unfiled snippets carry no projectId key, which stores as NULL
        assert!(row.get("projectId").is_none());
    }

    #[test]
    fn test_parse_snippet_round_trip() {
        let row = serde_json::json!({
            "id": "snip_1",
            "userId": "usr_1",
            "projectId": null,
            "title": "LRU cache",
            "code": "struct Lru;",
            "language": "rust",
            "tags": "[\"cache\"]",
            "isPublic": 1,
            "createdAt": "2024-01-01T00:00:00+00:00",
            "updatedAt": "2024-01-02T00:00:00+00:00",
        });
        let snippet = parse_snippet(&row).expect("parse snippet");
        assert_eq!(snippet.project_id, None);
        assert_eq!(snippet.tags, vec!["cache"]);
        assert!(snippet.is_public);
    }

    #[test]
    fn test_parse_subscription_defaults() {
        let row = serde_json::json!({
            "id": "sub_row_1",
            "userId": "usr_1",
            "planType": "PRO",
            "status": "active",
            "cancelAtPeriodEnd": 0,
            "createdAt": "2024-01-01T00:00:00+00:00",
            "updatedAt": "2024-01-01T00:00:00+00:00",
        });
        let sub = parse_subscription(&row).expect("parse subscription");
        assert_eq!(sub.plan_type, PlanType::Pro);
        assert!(!sub.cancel_at_period_end);
        assert_eq!(sub.stripe_customer_id, None);
    }
}
