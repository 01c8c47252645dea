// snipstash-sqlx — database storage for Snipstash on sqlx's Any driver.
//
// One adapter serves Postgres, MySQL, and SQLite. `schema` renders the core
// table definitions as dialect-aware DDL and `migration` diffs them against
// the live database; `statement` assembles the runtime SQL.

pub mod adapter;
pub mod migration;
pub mod schema;
mod statement;
pub mod transaction;

pub use adapter::SqlxAdapter;
pub use migration::{get_migrations, get_migrations_auto, MigrationPlan};
pub use transaction::SqlxTransaction;
