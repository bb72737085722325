//! Deep research and counsel orchestration
//!
//! A run starts with a bounded breadth-first crawl seeded by web search.
//! Every fetched page is folded into a running narrative by the model, which
//! also picks the links worth following. In counsel mode the finished
//! research is handed to several analysts in parallel; they vote on each
//! other's work and a final synthesis integrates everything.
//!
//! # Architecture
//!
//! - [`search`] - web search with API, HTML and curated fallbacks
//! - [`fetch`] - page retrieval and main-content extraction
//! - [`repair`] - recovery of JSON objects from model output
//! - [`crawl::CrawlEngine`] - the bounded BFS synthesis loop
//! - [`voting`] - peer voting and tallying
//! - [`counsel::CounselOrchestrator`] - phase sequencing and analyst fan-out
//! - [`status`] - run status folded from progress events
//! - [`recorder`] - hand-off of session and run records to the host
//! - [`service::ResearchService`] - the entry point hosts embed
//!
//! # Usage
//!
//! ```ignore
//! use counsel::research::{InMemoryRecorder, ResearchService};
//! use counsel::types::{RunMode, RunRequest};
//! use counsel::utils::toml_config::CounselConfig;
//! use std::sync::Arc;
//!
//! let service = ResearchService::from_config(CounselConfig::default(), Arc::new(InMemoryRecorder::new()))?;
//! let status = service
//!     .run_to_completion(RunRequest {
//!         topic: "solar power".into(),
//!         model: "llama3.2".into(),
//!         mode: RunMode::Counsel,
//!         num_members: 3,
//!     })
//!     .await?;
//!
//! for result in status.results {
//!     println!("{}: {}", result.agent, result.content);
//! }
//! ```

pub mod counsel;
pub mod crawl;
pub mod fetch;
pub mod recorder;
pub mod repair;
pub mod search;
pub mod service;
pub mod status;
pub mod voting;

pub use counsel::{build_analysts, CounselOrchestrator};
pub use crawl::{CrawlEngine, CrawlOutcome, NO_RESULTS_NARRATIVE};
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use recorder::{InMemoryRecorder, NoopRecorder, RunRecorder};
pub use search::{SearchProvider, WebSearch};
pub use service::ResearchService;
pub use status::{spawn_status_board, ProgressSink, RunEvent, StatusHandle};
pub use voting::{cast_votes, voting_summary, VoteTally};
