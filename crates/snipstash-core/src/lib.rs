#![doc = include_str!("../README.md")]

pub mod db;
pub mod env;
pub mod error;
pub mod logger;
pub mod options;
pub mod plan;
pub mod utils;

// Re-exports for convenience
pub use db::adapter::{Adapter, TransactionAdapter};
pub use db::models::{CommunityLike, CommunityPost, Project, Snippet, UserRecord};
pub use error::{ApiError, ErrorCode, SnipstashError};
pub use logger::{AppLogger, LogHandler, LogLevel, LoggerConfig};
pub use options::AppOptions;
pub use plan::{PlanLimits, PlanType};
