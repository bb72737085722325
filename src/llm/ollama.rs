use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{generation::completion::request::GenerationRequest, Ollama};
use std::time::Duration;
use url::Url;

const DEFAULT_PORT: u16 = 11434;

/// Client for a local Ollama server using the non-streaming generate API.
///
/// Generation and model listing go through separate `Ollama` handles so the
/// listing call can use a much shorter timeout than a generate call.
pub struct OllamaClient {
    client: Ollama,
    tags: Ollama,
    host: String,
    port: u16,
    base_url: String,
}

impl OllamaClient {
    /// Create a client. `timeout` bounds each generate call; a call that
    /// exceeds it fails that unit of work only.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into());
        let (host, port) = split_host_port(&base_url)?;

        Ok(Self {
            client: Ollama::new_with_client(host.clone(), port, http_client(timeout)?),
            tags: Ollama::new_with_client(host.clone(), port, http_client(Duration::from_secs(5))?),
            host,
            port,
            base_url,
        })
    }

    /// Override the (shorter) timeout used for the model listing call.
    pub fn with_models_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.tags = Ollama::new_with_client(self.host.clone(), self.port, http_client(timeout)?);
        Ok(self)
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Strip trailing slashes and default the scheme so `localhost:11434` works.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Split a base URL into the `scheme://host` and port pair `Ollama` expects.
fn split_host_port(base_url: &str) -> Result<(String, u16)> {
    let url = Url::parse(base_url)
        .map_err(|e| AppError::Configuration(format!("Invalid Ollama URL '{}': {}", base_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Configuration(format!("Ollama URL '{}' has no host", base_url)))?;
    let port = url.port().unwrap_or(DEFAULT_PORT);
    Ok((format!("{}://{}", url.scheme(), host), port))
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str, system: Option<&str>) -> Result<String> {
        let mut request = GenerationRequest::new(model.to_string(), prompt.to_string());
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            request = request.system(system.to_string());
        }

        tracing::debug!(model, prompt_chars = prompt.len(), "Sending generate request");

        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error for model '{}': {}", model, e)))?;

        tracing::debug!(model, response_chars = response.response.len(), "Generate complete");
        Ok(response.response)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let models = self
            .tags
            .list_local_models()
            .await
            .map_err(|e| AppError::Transport(format!("Ollama model listing failed: {}", e)))?;

        Ok(models.into_iter().map(|m| m.name).collect())
    }

    fn backend_name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(
            normalize_base_url("http://localhost:11434/"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_base_url("192.168.1.100:8080"),
            "http://192.168.1.100:8080"
        );
        assert_eq!(
            normalize_base_url("https://ollama.internal"),
            "https://ollama.internal"
        );
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(
            split_host_port("http://localhost:11434").unwrap(),
            ("http://localhost".to_string(), 11434)
        );
        assert_eq!(
            split_host_port("http://10.0.0.2:8080").unwrap(),
            ("http://10.0.0.2".to_string(), 8080)
        );
        assert_eq!(
            split_host_port("https://ollama.internal").unwrap(),
            ("https://ollama.internal".to_string(), DEFAULT_PORT)
        );
        assert!(split_host_port("http://").is_err());
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new("localhost:11434", Duration::from_secs(1))
            .unwrap()
            .with_models_timeout(Duration::from_millis(500))
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.backend_name(), "ollama");
    }
}
