#![doc = include_str!("../README.md")]

pub mod codecheck;
pub mod context;
pub mod identity;
pub mod quota;
pub mod routes;
pub mod store;

pub use codecheck::{check_code, CodeNote, CodeReport};
pub use context::AppContext;
pub use identity::{ensure_user, Identity, IdentityProvider, SignedTokenProvider, StaticTokens};
pub use quota::{QuotaDecision, Usage};
pub use store::{ConcreteStore, SnippetFilter, Store, StoreError, NO_PROJECT_BUCKET};
