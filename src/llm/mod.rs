//! LLM provider clients and abstractions
//!
//! A unified [`LLMClient`] interface over the supported chat providers:
//! OpenAI (full tool calling) and Ollama (plain chat; tool calling depends
//! on model support and is not wired up). The model identifier always comes
//! from the resolved agent settings, never from code.

pub mod client;
pub mod ollama;
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, LLMResponse, Provider, ProviderClientFactory};
