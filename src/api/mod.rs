//! HTTP transport
//!
//! A thin axum surface over the invoker: `POST /api/chat` for chat turns
//! and `GET /health` for liveness. All agent behavior lives below this
//! layer; handlers only translate between JSON and [`crate::agents`].

/// Request handlers.
pub mod handlers;
/// Router construction and middleware.
pub mod routes;

pub use routes::create_router;
