//! # Counsel - Deep Research with a Counsel of Analysts
//!
//! A research pipeline that crawls the web around a topic, folds what it
//! reads into a running narrative with a local model, and optionally asks a
//! counsel of analysts to interpret the findings, vote on each other's work
//! and produce a final synthesis.
//!
//! ## Overview
//!
//! Counsel can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `counsel-server` binary
//! 2. **As a library** - Embed [`ResearchService`] in your own host
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use counsel::{CounselConfig, InMemoryRecorder, ResearchService, RunMode, RunRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ResearchService::from_config(
//!         CounselConfig::default(),
//!         Arc::new(InMemoryRecorder::new()),
//!     )?;
//!
//!     let started = service.start_run(RunRequest {
//!         topic: "solar power".to_string(),
//!         model: "llama3.2".to_string(),
//!         mode: RunMode::Counsel,
//!         num_members: 3,
//!     })?;
//!
//!     let mut updates = service.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let status = updates.borrow().clone();
//!         println!("{}% {}", status.progress, status.current_phase);
//!         if status.run_id == Some(started.run_id) && !status.is_running {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`llm`] - Text-generation backend clients
//! - [`research`] - Crawl, counsel, voting, status and the run service
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration
//! - [`cli`] - Command-line parsing and terminal output

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface definitions and output helpers.
pub mod cli;
/// LLM backend clients.
pub mod llm;
/// Deep research crawl and counsel orchestration.
pub mod research;
/// Core types (requests, results, status, errors).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, OllamaClient};
pub use research::{
    CounselOrchestrator, CrawlEngine, InMemoryRecorder, NoopRecorder, PageFetcher,
    ResearchService, RunRecorder, SearchProvider,
};
pub use types::{
    AppError, PhaseResult, Result, ResultKind, RunMode, RunRequest, RunStatus, StartResponse,
};
pub use utils::toml_config::CounselConfig;
