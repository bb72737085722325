//! Text-generation backend clients
//!
//! The research pipeline only needs two things from a model backend: turn a
//! prompt (plus an optional system instruction) into text, and list the
//! models that can be asked. Both live behind [`LLMClient`] so the crawl and
//! counsel code can be driven by a scripted client in tests.
//!
//! # Supported Backends
//!
//! - [`ollama::OllamaClient`] - Local Ollama server (`/api/generate`, `/api/tags`)
//!
//! # Example
//!
//! ```ignore
//! use counsel::llm::{LLMClient, OllamaClient};
//! use std::time::Duration;
//!
//! let client = OllamaClient::new("http://localhost:11434", Duration::from_secs(300))?;
//! let text = client.generate("llama3.2", "What is 2+2?", None).await?;
//! ```

/// Core LLM client trait.
pub mod client;
/// Ollama HTTP client.
pub mod ollama;

pub use client::LLMClient;
pub use ollama::OllamaClient;
