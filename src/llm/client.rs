//! LLM client abstraction
//!
//! A model is chosen per call rather than per client: one run drives the
//! crawl, every analyst and the final synthesis through a single shared
//! client, and each analyst carries its own model id.

use crate::types::Result;
use async_trait::async_trait;

/// Generic LLM client trait for backend abstraction
///
/// Implementations must be cheap to share (`Arc<dyn LLMClient>`) because the
/// counsel phase hands the same client to every concurrent analyst task.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion for `prompt` with `model`, optionally steered by
    /// a system instruction. Returns the raw text the model produced.
    async fn generate(&self, model: &str, prompt: &str, system: Option<&str>) -> Result<String>;

    /// List the model names the backend can serve.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Short backend name used in logs.
    fn backend_name(&self) -> &str;
}
