//! Finance tools exposed to the agent
//!
//! Each tool implements [`registry::Tool`]: a stable snake_case name, a
//! description and JSON schema handed to the model, and an `execute` that
//! returns plain text the model can relay to the user. Tools are looked up
//! by name through a static constructor table in
//! [`registry::SharedToolRegistry`]; there is no runtime discovery.
//!
//! All tools operate on the shared [`BuffetDb`](crate::db::BuffetDb) and are
//! scoped to the user id passed in their arguments.

/// Category tools: create, search, list, rename, delete.
pub mod category;
/// Tool trait, registry, and atomic reload.
pub mod registry;
/// Transaction tools: create, search, update amount, delete.
pub mod transaction;

pub use registry::{SharedToolRegistry, Tool, ToolRegistry};
