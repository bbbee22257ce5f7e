/// Chat endpoint.
pub mod chat;
