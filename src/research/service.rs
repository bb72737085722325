//! Run service
//!
//! [`ResearchService`] is what a host embeds: it validates requests, spawns
//! runs on the tokio runtime and exposes the status board. Hosts own any
//! HTTP or storage layer around it.

use crate::{
    llm::{LLMClient, OllamaClient},
    research::{
        counsel::CounselOrchestrator,
        crawl::CrawlEngine,
        fetch::{HttpPageFetcher, PageFetcher},
        recorder::RunRecorder,
        search::{SearchProvider, WebSearch},
        status::{spawn_status_board, ProgressSink, RunEvent, StatusHandle},
    },
    types::{AppError, Result, RunMode, RunRequest, RunStatus, StartResponse},
    utils::toml_config::CounselConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct ResearchService {
    config: CounselConfig,
    llm: Arc<dyn LLMClient>,
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    recorder: Arc<dyn RunRecorder>,
    sink: ProgressSink,
    status: StatusHandle,
}

impl ResearchService {
    /// Assemble a service from explicit collaborators. Spawns the status
    /// board, so this must run inside a tokio runtime.
    pub fn new(
        config: CounselConfig,
        llm: Arc<dyn LLMClient>,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        recorder: Arc<dyn RunRecorder>,
    ) -> Self {
        let (sink, status) = spawn_status_board();
        Self {
            config,
            llm,
            search,
            fetcher,
            recorder,
            sink,
            status,
        }
    }

    /// Build the default stack: Ollama inference, DuckDuckGo search and the
    /// HTTP page fetcher.
    pub fn from_config(config: CounselConfig, recorder: Arc<dyn RunRecorder>) -> Result<Self> {
        let llm = OllamaClient::new(
            config.inference.base_url.clone(),
            Duration::from_secs(config.inference.timeout_secs),
        )?
        .with_models_timeout(Duration::from_secs(config.inference.models_timeout_secs))?;
        let search = WebSearch::new(&config.search)?;
        let fetcher = HttpPageFetcher::new(config.fetch.clone(), &config.search.user_agent)?;

        Ok(Self::new(
            config,
            Arc::new(llm),
            Arc::new(search),
            Arc::new(fetcher),
            recorder,
        ))
    }

    pub fn config(&self) -> &CounselConfig {
        &self.config
    }

    /// Validate `request` and start it in the background.
    ///
    /// A new run supersedes any run still in flight as far as the status
    /// board is concerned; the older task keeps running but its events are
    /// ignored.
    pub fn start_run(&self, request: RunRequest) -> Result<StartResponse> {
        let (run_id, _handle) = self.launch(request)?;
        Ok(StartResponse {
            status: "started".to_string(),
            run_id,
        })
    }

    /// Start a run and wait for it, including its recorder hand-off.
    pub async fn run_to_completion(&self, request: RunRequest) -> Result<RunStatus> {
        let (run_id, handle) = self.launch(request)?;
        if let Err(e) = handle.await {
            tracing::error!(%run_id, error = %e, "Run task failed");
        }
        Ok(self.status.wait_finished(run_id).await)
    }

    /// Latest status snapshot.
    pub fn status(&self) -> RunStatus {
        self.status.snapshot()
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    /// Models offered by the inference backend; empty when unreachable.
    pub async fn models(&self) -> Vec<String> {
        match self.llm.list_models().await {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!(backend = self.llm.backend_name(), error = %e, "Failed to list models");
                Vec::new()
            }
        }
    }

    fn launch(&self, request: RunRequest) -> Result<(Uuid, JoinHandle<()>)> {
        let request = self.normalize(request)?;
        let run_id = Uuid::new_v4();

        tracing::info!(
            %run_id,
            topic = %request.topic,
            model = %request.model,
            mode = %request.mode,
            num_members = request.num_members,
            "Run requested"
        );

        self.sink.send(RunEvent::Started { run_id });
        let guard = self.sink.finish_guard(run_id);
        let orchestrator = self.orchestrator();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            orchestrator.run(run_id, &request).await;
        });

        Ok((run_id, handle))
    }

    fn normalize(&self, mut request: RunRequest) -> Result<RunRequest> {
        request.topic = request.topic.trim().to_string();
        if request.topic.is_empty() {
            return Err(AppError::InvalidInput("topic must not be empty".to_string()));
        }

        request.model = request.model.trim().to_string();
        if request.model.is_empty() {
            request.model = self.config.inference.default_model.clone().unwrap_or_default();
        }
        if request.model.is_empty() {
            return Err(AppError::InvalidInput(
                "model must not be empty (no default model configured)".to_string(),
            ));
        }

        if request.mode == RunMode::Counsel && request.num_members == 0 {
            return Err(AppError::InvalidInput(
                "counsel mode needs at least one member".to_string(),
            ));
        }

        Ok(request)
    }

    fn orchestrator(&self) -> CounselOrchestrator {
        let engine = CrawlEngine::new(
            Arc::clone(&self.search),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.llm),
            self.config.crawl.clone(),
        )
        .with_search_results(self.config.search.max_results);

        CounselOrchestrator::new(
            engine,
            Arc::clone(&self.llm),
            self.config.counsel.clone(),
            self.sink.clone(),
            Arc::clone(&self.recorder),
        )
    }
}
