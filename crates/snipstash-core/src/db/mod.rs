pub mod adapter;
pub mod models;
pub mod schema;

pub use adapter::Adapter;
pub use models::{CommunityLike, CommunityPost, Project, Snippet, UserRecord};
pub use schema::{AppSchema, AppTable, FieldType, SchemaField};
