use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============= Search Types =============

/// Canonical search record every search method converges to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A raw hit as produced by one of the search methods, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchHit {
    /// Related-topic entry from the structured answer API.
    Api { text: String, first_url: String },
    /// Result block scraped from the HTML search page.
    Html {
        title: String,
        href: String,
        snippet: String,
    },
    /// Generated reference-site entry used when live search yields nothing.
    Curated {
        title: String,
        url: String,
        snippet: String,
    },
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        match hit {
            SearchHit::Api { text, first_url } => {
                let title = if text.is_empty() {
                    "Related Result".to_string()
                } else {
                    text.clone()
                };
                SearchResult {
                    title,
                    url: first_url,
                    snippet: text.chars().take(200).collect(),
                }
            }
            SearchHit::Html {
                title,
                href,
                snippet,
            } => SearchResult {
                title: if title.is_empty() {
                    "Search Result".to_string()
                } else {
                    title
                },
                url: href,
                snippet,
            },
            SearchHit::Curated {
                title,
                url,
                snippet,
            } => SearchResult {
                title,
                url,
                snippet,
            },
        }
    }
}

// ============= Crawl Types =============

/// A fetched page: truncated main text plus same-site outbound links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub content: String,
    pub links: Vec<String>,
}

/// One pending crawl target. Depth starts at 1 for search seeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: usize,
}

// ============= Counsel Types =============

/// Immutable description of one analyst for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystSpec {
    pub name: String,
    pub perspective: String,
    pub model: String,
}

/// Output of one analyst.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub agent_name: String,
    pub perspective: String,
    pub content: String,
    pub timestamp: String,
}

/// One ballot. `voted_for` is never the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: String,
    pub voted_for: String,
    pub timestamp: String,
}

// ============= Run Types =============

/// Which pipeline a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Crawl and summarise only.
    #[default]
    Single,
    /// Crawl, then analyse, vote and synthesise with a counsel of analysts.
    Counsel,
}

impl std::str::FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(RunMode::Single),
            "counsel" => Ok(RunMode::Counsel),
            other => Err(AppError::InvalidInput(format!(
                "Unknown mode '{}', expected 'single' or 'counsel'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Single => write!(f, "single"),
            RunMode::Counsel => write!(f, "counsel"),
        }
    }
}

/// Orchestration phase. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Research,
    Analysis,
    Voting,
    Synthesis,
    Done,
}

/// What a [`PhaseResult`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Summary,
    Research,
    Counsel,
    Voting,
    Synthesis,
}

/// One entry in the run's ordered result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub kind: ResultKind,
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    pub content: String,
    pub sources: Vec<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<Vec<Vote>>,
}

impl PhaseResult {
    /// Build a result stamped with the current wall-clock label.
    pub fn new(kind: ResultKind, agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            agent: agent.into(),
            perspective: None,
            content: content.into(),
            sources: Vec::new(),
            timestamp: timestamp_label(),
            votes: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_perspective(mut self, perspective: impl Into<String>) -> Self {
        self.perspective = Some(perspective.into());
        self
    }

    pub fn with_votes(mut self, votes: Vec<Vote>) -> Self {
        self.votes = Some(votes);
        self
    }
}

/// Snapshot of the current (or most recent) run, as seen by status readers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: Option<Uuid>,
    pub is_running: bool,
    /// 0-100, non-decreasing within a run.
    pub progress: u8,
    pub phase: Phase,
    pub current_phase: String,
    pub results: Vec<PhaseResult>,
    pub sources: Vec<String>,
    pub votes: Vec<Vote>,
}

/// Request accepted by [`crate::ResearchService::start_run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub topic: String,
    pub model: String,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default = "default_num_members")]
    pub num_members: usize,
}

fn default_num_members() -> usize {
    2
}

/// Acknowledgement returned when a run has been scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub status: String,
    pub run_id: Uuid,
}

// ============= Persistence Hand-off Types =============

/// One analyst (or researcher) contribution to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub agent: String,
    pub content: String,
    pub timestamp: String,
}

/// Incrementally updated research session handed to the host for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub topic: String,
    pub agents: Vec<String>,
    pub findings: Vec<Finding>,
    pub sources: Vec<String>,
}

impl SessionRecord {
    pub fn new(id: Uuid, topic: &str, agents: Vec<String>) -> Self {
        Self {
            id,
            topic: topic.to_string(),
            agents,
            findings: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Append a finding and merge its sources, keeping first occurrences.
    pub fn add_finding(&mut self, agent: &str, content: &str, sources: &[String]) {
        self.findings.push(Finding {
            agent: agent.to_string(),
            content: content.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        for source in sources {
            if !self.sources.contains(source) {
                self.sources.push(source.clone());
            }
        }
    }
}

/// Completed run handed to the host after the terminal status update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedRun {
    pub timestamp: String,
    pub topic: String,
    pub mode: RunMode,
    /// Zero for single-mode runs.
    pub num_members: usize,
    pub results: Vec<PhaseResult>,
    pub sources: Vec<String>,
    pub votes: Vec<Vote>,
}

/// Wall-clock label (`HH:MM:SS`) attached to results and votes.
pub fn timestamp_label() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
