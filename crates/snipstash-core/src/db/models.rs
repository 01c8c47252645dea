// Typed records for the core application tables.
//
// Timestamps are RFC 3339 strings, matching what the adapters store. The
// store layer in the `snipstash` crate converts between these models and the
// raw JSON rows.

use serde::{Deserialize, Serialize};

/// Local mirror of an externally-authenticated user.
///
/// The identity provider owns the id; a row is upserted here on first sight
/// so the other tables have something to reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRecord {
    pub fn new(id: String, email: String, name: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            email: email.to_lowercase(),
            name,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A user-owned container for snippets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A saved unit of source code with metadata.
///
/// `is_public` is the one flag with side effects: flipping it mirrors the
/// snippet into (or removes it from) the community table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub title: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// The public-feed projection of a published snippet.
///
/// A denormalized copy taken at publish time: later edits to the source
/// snippet do not propagate here. `created_at` preserves the snippet's
/// original creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPost {
    pub id: String,
    pub snippet_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub title: String,
    pub code: String,
    pub language: String,
    pub tags: Vec<String>,
    pub likes_count: i64,
    pub views_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl CommunityPost {
    /// Build the publish-time copy of a snippet, with zeroed counters and the
    /// snippet's original creation time.
    pub fn from_snippet(id: String, snippet: &Snippet) -> Self {
        Self {
            id,
            snippet_id: snippet.id.clone(),
            user_id: snippet.user_id.clone(),
            project_id: snippet.project_id.clone(),
            title: snippet.title.clone(),
            code: snippet.code.clone(),
            language: snippet.language.clone(),
            tags: snippet.tags.clone(),
            likes_count: 0,
            views_count: 0,
            created_at: snippet.created_at.clone(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One user's like on one community post.
///
/// At most one row exists per (post, user) pair; the toggle logic queries
/// before inserting or deleting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityLike {
    pub id: String,
    pub community_id: String,
    pub user_id: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_lowercases_email() {
        let user = UserRecord::new("u1".into(), "Dev@Example.COM".into(), "Dev".into());
        assert_eq!(user.email, "dev@example.com");
    }

    #[test]
    fn test_community_post_copies_snippet_fields() {
        let snippet = Snippet {
            id: "s1".into(),
            user_id: "u1".into(),
            project_id: Some("p1".into()),
            title: "Debounce".into(),
            code: "export const debounce = ...".into(),
            language: "ts".into(),
            tags: vec!["util".into()],
            is_public: true,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-06-01T00:00:00+00:00".into(),
        };
        let post = CommunityPost::from_snippet("c1".into(), &snippet);
        assert_eq!(post.snippet_id, "s1");
        assert_eq!(post.title, "Debounce");
        assert_eq!(post.likes_count, 0);
        assert_eq!(post.views_count, 0);
        // Publish preserves the snippet's original creation time
        assert_eq!(post.created_at, "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_snippet_serializes_camel_case() {
        let snippet = Snippet {
            id: "s1".into(),
            user_id: "u1".into(),
            project_id: None,
            title: "t".into(),
            code: "c".into(),
            language: "rs".into(),
            tags: vec![],
            is_public: false,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        };
        let value = serde_json::to_value(&snippet).unwrap();
        assert!(value.get("userId").is_some());
        assert!(value.get("isPublic").is_some());
        assert!(value.get("projectId").is_none());
    }
}
