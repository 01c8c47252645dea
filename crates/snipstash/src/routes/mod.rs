// Route handlers.
//
// Each sub-module implements the handlers for one resource. Handlers are
// plain async functions taking `Arc<AppContext>` plus the authenticated
// user id; the HTTP crate maps their typed errors onto API responses.

pub mod billing;
pub mod community;
pub mod projects;
pub mod snippets;
pub mod visibility;
