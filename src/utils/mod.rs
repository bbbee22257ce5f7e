/// TOML-based configuration (`buffet.toml`).
pub mod config;
