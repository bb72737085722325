//! Mock implementations for testing.
//!
//! Hand-written stand-ins for the model backend, search provider and page
//! fetcher, shared across the integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use counsel::llm::LLMClient;
use counsel::research::{PageFetcher, SearchProvider};
use counsel::types::{AppError, Page, Result, SearchResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Which pipeline step a model call belongs to, recognized from its system
/// instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    PageSynthesis,
    Followups,
    Polish,
    Analysis,
    FinalSynthesis,
    Other,
}

impl CallKind {
    fn classify(system: Option<&str>) -> Self {
        let system = system.unwrap_or_default();
        if system.contains("research synthesizer") {
            CallKind::PageSynthesis
        } else if system.contains("Output only valid JSON") {
            CallKind::Followups
        } else if system.contains("Create a coherent, factual summary") {
            CallKind::Polish
        } else if system.contains("a counsel member") {
            CallKind::Analysis
        } else if system.contains("synthesis expert") {
            CallKind::FinalSynthesis
        } else {
            CallKind::Other
        }
    }
}

/// One recorded model call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
}

/// Model client that answers each pipeline step with a canned response.
///
/// Analysts are recognized by the name in their system instruction
/// ("You are Analyst Beta, ..."); names listed in `failing_analysts` get an
/// error instead of an analysis.
pub struct ScriptedLLM {
    page_synthesis: String,
    followups: String,
    polish: String,
    final_synthesis: String,
    failing_analysts: Vec<String>,
    fail_steps: Vec<CallKind>,
    models: Vec<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedLLM {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLLM {
    pub fn new() -> Self {
        Self {
            page_synthesis: "Synthesized narrative.".to_string(),
            followups: r#"{"followups": []}"#.to_string(),
            polish: "Polished narrative.".to_string(),
            final_synthesis: "Final integrated report.".to_string(),
            failing_analysts: vec![],
            fail_steps: vec![],
            models: vec!["llama3.2".to_string()],
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Raw text returned for follow-up selection calls.
    pub fn with_followups_response(mut self, raw: &str) -> Self {
        self.followups = raw.to_string();
        self
    }

    /// Follow-up selection returns exactly these URLs.
    pub fn with_followups(self, urls: &[&str]) -> Self {
        let raw = serde_json::json!({ "followups": urls }).to_string();
        self.with_followups_response(&raw)
    }

    pub fn with_polish(mut self, text: &str) -> Self {
        self.polish = text.to_string();
        self
    }

    pub fn failing_analyst(mut self, name: &str) -> Self {
        self.failing_analysts.push(name.to_string());
        self
    }

    /// Every call of this kind returns an error.
    pub fn failing_step(mut self, kind: CallKind) -> Self {
        self.fail_steps.push(kind);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect()
    }

    fn analyst_name(system: &str) -> Option<&str> {
        let rest = system.strip_prefix("You are ")?;
        rest.split(',').next()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLM {
    async fn generate(&self, model: &str, prompt: &str, system: Option<&str>) -> Result<String> {
        let kind = CallKind::classify(system);
        self.calls.lock().push(RecordedCall {
            kind,
            model: model.to_string(),
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
        });

        if self.fail_steps.contains(&kind) {
            return Err(AppError::LLM(format!("scripted failure for {:?}", kind)));
        }

        match kind {
            CallKind::PageSynthesis => Ok(self.page_synthesis.clone()),
            CallKind::Followups => Ok(self.followups.clone()),
            CallKind::Polish => Ok(self.polish.clone()),
            CallKind::FinalSynthesis => Ok(self.final_synthesis.clone()),
            CallKind::Analysis => {
                let name = system.and_then(Self::analyst_name).unwrap_or("unknown");
                if self.failing_analysts.iter().any(|n| n == name) {
                    Err(AppError::LLM(format!("{} is unavailable", name)))
                } else {
                    Ok(format!("{} analysis of the research.", name))
                }
            }
            CallKind::Other => Ok(String::new()),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.models.clone())
    }

    fn backend_name(&self) -> &str {
        "scripted"
    }
}

/// Model client whose every call fails.
pub struct FailingLLM;

#[async_trait]
impl LLMClient for FailingLLM {
    async fn generate(&self, _model: &str, _prompt: &str, _system: Option<&str>) -> Result<String> {
        Err(AppError::LLM("backend unreachable".to_string()))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Err(AppError::Transport("backend unreachable".to_string()))
    }

    fn backend_name(&self) -> &str {
        "failing"
    }
}

/// Search provider returning a fixed list of URLs.
pub struct StaticSearch {
    results: Vec<SearchResult>,
    calls: AtomicUsize,
}

impl StaticSearch {
    pub fn new(urls: &[&str]) -> Self {
        Self {
            results: urls
                .iter()
                .map(|url| SearchResult {
                    title: format!("Result for {}", url),
                    url: url.to_string(),
                    snippet: String::new(),
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _topic: &str, max_results: usize) -> Vec<SearchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results.iter().take(max_results).cloned().collect()
    }
}

/// Search provider that panics, for exercising run-task unwinding.
pub struct PanickingSearch;

#[async_trait]
impl SearchProvider for PanickingSearch {
    async fn search(&self, _topic: &str, _max_results: usize) -> Vec<SearchResult> {
        panic!("search backend crashed");
    }
}

/// Fetcher serving pages from a map; unknown URLs fail to fetch.
#[derive(Default)]
pub struct MapFetcher {
    pages: HashMap<String, Page>,
    fetched: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, content: &str, links: &[&str]) -> Self {
        self.pages.insert(
            url.to_string(),
            Page {
                content: content.to_string(),
                links: links.iter().map(|l| l.to_string()).collect(),
            },
        );
        self
    }

    /// Every fetch attempt in order, including misses.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Option<Page> {
        self.fetched.lock().push(url.to_string());
        self.pages.get(url).cloned()
    }
}
