use crate::{
    llm::LLMClient,
    research::{
        crawl::CrawlEngine,
        recorder::RunRecorder,
        status::{ProgressSink, RunEvent},
        voting::{cast_votes, voting_summary, VoteTally},
    },
    types::{
        timestamp_label, AnalysisResult, AnalystSpec, AppError, CompletedRun, Phase, PhaseResult,
        Result, ResultKind, RunMode, RunRequest, SessionRecord, Vote,
    },
    utils::toml_config::CounselSettings,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Perspective archetypes, cycled by analyst index.
pub const PERSPECTIVES: &[(&str, &str)] = &[
    ("Analyst Alpha", "critical analysis and skepticism"),
    ("Analyst Beta", "practical applications and real-world implications"),
    ("Analyst Gamma", "historical context and long-term trends"),
    ("Analyst Delta", "ethical considerations and societal impact"),
    ("Analyst Epsilon", "technical depth and scientific accuracy"),
    ("Analyst Zeta", "creative connections and alternative viewpoints"),
];

const RESEARCH_START_PROGRESS: u8 = 10;
const SINGLE_RESEARCH_PROGRESS: u8 = 50;
const RESEARCH_DONE_PROGRESS: u8 = 40;
const ANALYSIS_SPAN: f64 = 50.0;
const VOTING_PROGRESS: u8 = 92;
const SYNTHESIS_PROGRESS: u8 = 95;

const SYNTHESIS_SYSTEM: &str =
    "You are a synthesis expert. Create a clear, integrated final report following all rules exactly.";

/// Build `count` analysts for `model`. Names stay unique past the sixth
/// analyst by suffixing the cycle number ("Analyst Alpha 2").
pub fn build_analysts(count: usize, model: &str) -> Vec<AnalystSpec> {
    (0..count)
        .map(|i| {
            let (name, perspective) = PERSPECTIVES[i % PERSPECTIVES.len()];
            let cycle = i / PERSPECTIVES.len();
            AnalystSpec {
                name: if cycle == 0 {
                    name.to_string()
                } else {
                    format!("{} {}", name, cycle + 1)
                },
                perspective: perspective.to_string(),
                model: model.to_string(),
            }
        })
        .collect()
}

/// Drives one run through research, analysis, voting and synthesis.
///
/// The orchestrator reports progress only through its [`ProgressSink`] and
/// keeps its own copy of the results for the completed-run record.
pub struct CounselOrchestrator {
    engine: CrawlEngine,
    llm: Arc<dyn LLMClient>,
    settings: CounselSettings,
    sink: ProgressSink,
    recorder: Arc<dyn RunRecorder>,
    rng: Mutex<StdRng>,
}

impl CounselOrchestrator {
    pub fn new(
        engine: CrawlEngine,
        llm: Arc<dyn LLMClient>,
        settings: CounselSettings,
        sink: ProgressSink,
        recorder: Arc<dyn RunRecorder>,
    ) -> Self {
        let rng = match settings.voting_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            engine,
            llm,
            settings,
            sink,
            recorder,
            rng: Mutex::new(rng),
        }
    }

    /// Execute a run and return its ordered results.
    pub async fn run(&self, run_id: Uuid, request: &RunRequest) -> Vec<PhaseResult> {
        match request.mode {
            RunMode::Single => self.run_single(run_id, request).await,
            RunMode::Counsel => self.run_counsel(run_id, request).await,
        }
    }

    async fn run_single(&self, run_id: Uuid, request: &RunRequest) -> Vec<PhaseResult> {
        let topic = request.topic.as_str();
        self.phase(run_id, Phase::Research, "Deep Research in Progress...", RESEARCH_START_PROGRESS);

        let mut session = SessionRecord::new(run_id, topic, vec!["Single Pass Researcher".to_string()]);
        self.recorder.session_updated(&session);

        self.progress(run_id, SINGLE_RESEARCH_PROGRESS);
        let outcome = self.engine.research(topic, &request.model).await;

        let summary = PhaseResult::new(ResultKind::Summary, "Research Summary", outcome.narrative.clone())
            .with_sources(outcome.sources.clone());
        self.sink.send(RunEvent::Sources {
            run_id,
            sources: outcome.sources.clone(),
        });
        self.push_result(run_id, &summary);

        session.add_finding("Researcher", &outcome.narrative, &outcome.sources);
        self.recorder.session_updated(&session);

        let results = vec![summary];
        self.complete(run_id, request, 0, &results, outcome.sources, Vec::new());
        results
    }

    async fn run_counsel(&self, run_id: Uuid, request: &RunRequest) -> Vec<PhaseResult> {
        let topic = request.topic.as_str();
        let num_members = request.num_members;
        tracing::info!(topic, num_members, "Starting counsel research");

        // Phase 1: research
        self.phase(run_id, Phase::Research, "Conducting Deep Research...", RESEARCH_START_PROGRESS);
        let outcome = self.engine.research(topic, &request.model).await;
        tracing::info!(
            sources = outcome.sources.len(),
            chars = outcome.narrative.len(),
            "Research phase complete"
        );

        self.sink.send(RunEvent::Sources {
            run_id,
            sources: outcome.sources.clone(),
        });
        self.progress(run_id, RESEARCH_DONE_PROGRESS);

        let mut results = Vec::new();
        let research = PhaseResult::new(ResultKind::Research, "Research Findings", outcome.narrative.clone())
            .with_sources(outcome.sources.clone());
        self.push_result(run_id, &research);
        results.push(research);

        // Phase 2: parallel analysis
        let analysts = build_analysts(num_members, &request.model);
        let agent_names: Vec<String> = analysts.iter().map(|a| a.name.clone()).collect();
        let mut session = SessionRecord::new(run_id, topic, agent_names.clone());
        self.recorder.session_updated(&session);

        self.phase(
            run_id,
            Phase::Analysis,
            &format!("{} Counsel Members Analyzing...", num_members),
            RESEARCH_DONE_PROGRESS,
        );

        let analyses = self
            .analyze_all(run_id, topic, &outcome.narrative, &outcome.sources, analysts, &mut session)
            .await;
        for analysis in &analyses {
            results.push(counsel_result(analysis));
        }

        // Phase 3: voting
        self.phase(run_id, Phase::Voting, "Counsel Members Voting...", VOTING_PROGRESS);
        // Only members whose analysis completed take part in the vote.
        let voters: Vec<String> = analyses.iter().map(|a| a.agent_name.clone()).collect();
        let votes = self.vote(&voters);
        for vote in &votes {
            tracing::info!(voter = %vote.voter, voted_for = %vote.voted_for, "Vote cast");
        }
        self.sink.send(RunEvent::Votes {
            run_id,
            votes: votes.clone(),
        });

        let tally = VoteTally::from_votes(&votes);
        match tally.winner() {
            Some((winner, count)) => tracing::info!(winner, count, "Voting winner"),
            None => tracing::warn!("No votes cast"),
        }

        let voting = PhaseResult::new(
            ResultKind::Voting,
            "Voting Results",
            voting_summary(&agent_names, &tally),
        )
        .with_votes(votes.clone());
        self.push_result(run_id, &voting);
        results.push(voting);

        // Phase 4: synthesis
        self.phase(run_id, Phase::Synthesis, "Generating Final Synthesis...", SYNTHESIS_PROGRESS);
        let synthesis_text = self
            .synthesize(topic, &request.model, &outcome.narrative, &analyses, &tally, num_members)
            .await;
        let synthesis = PhaseResult::new(ResultKind::Synthesis, "Final Synthesis", synthesis_text);
        self.push_result(run_id, &synthesis);
        results.push(synthesis);

        self.complete(run_id, request, num_members, &results, outcome.sources, votes);
        results
    }

    /// Scatter one task per analyst and gather them in completion order.
    /// Failed or panicked analysts are logged and left out.
    async fn analyze_all(
        &self,
        run_id: Uuid,
        topic: &str,
        narrative: &str,
        sources: &[String],
        analysts: Vec<AnalystSpec>,
        session: &mut SessionRecord,
    ) -> Vec<AnalysisResult> {
        let total = analysts.len();
        if total == 0 {
            return Vec::new();
        }

        let topic: Arc<str> = Arc::from(topic);
        let narrative: Arc<str> = Arc::from(narrative);
        let sources: Arc<[String]> = Arc::from(sources);

        let mut set = JoinSet::new();
        for spec in analysts {
            let llm = Arc::clone(&self.llm);
            let topic = Arc::clone(&topic);
            let narrative = Arc::clone(&narrative);
            let sources = Arc::clone(&sources);
            let name = spec.name.clone();

            set.spawn(async move {
                let outcome = analyze(llm.as_ref(), &spec, &topic, &narrative, &sources).await;
                (name, outcome)
            });
        }

        let mut completed = 0usize;
        let mut analyses = Vec::with_capacity(total);
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(analysis))) => {
                    completed += 1;
                    let progress = RESEARCH_DONE_PROGRESS as f64 + (ANALYSIS_SPAN / total as f64) * completed as f64;
                    self.progress(run_id, progress as u8);
                    self.push_result(run_id, &counsel_result(&analysis));

                    session.add_finding(&analysis.agent_name, &analysis.content, &[]);
                    self.recorder.session_updated(session);

                    tracing::info!(
                        analyst = %analysis.agent_name,
                        chars = analysis.content.len(),
                        "Analysis complete"
                    );
                    analyses.push(analysis);
                }
                Ok((name, Err(e))) => {
                    tracing::warn!(analyst = %name, error = %e, "Analyst failed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Analyst task aborted");
                }
            }
        }

        analyses
    }

    fn vote(&self, agent_names: &[String]) -> Vec<Vote> {
        let mut rng = self.rng.lock();
        cast_votes(agent_names, &mut *rng)
    }

    async fn synthesize(
        &self,
        topic: &str,
        model: &str,
        narrative: &str,
        analyses: &[AnalysisResult],
        tally: &VoteTally,
        num_members: usize,
    ) -> String {
        let all_analyses = analyses
            .iter()
            .map(|a| format!("{}: {}", a.agent_name, a.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let (voting_line, acknowledgement) = match tally.winner() {
            Some((winner, count)) => (
                format!(
                    "{} won with {} votes out of {} total votes.",
                    winner,
                    count,
                    tally.total()
                ),
                format!("Acknowledges the winning analysis from {}", winner),
            ),
            None => (
                format!("No votes were cast among {} counsel members.", num_members),
                "Notes that no analysis won the vote".to_string(),
            ),
        };

        let prompt = format!(
            r#"Topic: {topic}

Research Findings:
{research}

Counsel Member Analyses:
{analyses}

Voting Results: {voting_line}

Provide a comprehensive synthesis that:
1. Summarizes key findings
2. Highlights areas of agreement/disagreement among counsel members (aka Analysts)
3. Draws final conclusions
4. Notes confidence level
5. {acknowledgement}

IMPORTANT RULES - FOLLOW STRICTLY:
- Base the ENTIRE synthesis ONLY on the provided research findings and counsel analyses.
- Stay strictly on-topic: discuss ONLY {topic}. Do NOT introduce unrelated topics, examples, or diversions.
- Integrate the findings into one cohesive report; do not append the analyses one after another.
- Rely on all of the research, not a single source.
- Be concise: 4-6 paragraphs.
- No hallucinations: do not add new information."#,
            topic = topic,
            research = excerpt(narrative, self.settings.research_excerpt_chars),
            analyses = excerpt(&all_analyses, self.settings.analyses_excerpt_chars),
            voting_line = voting_line,
            acknowledgement = acknowledgement,
        );

        match self.llm.generate(model, &prompt, Some(SYNTHESIS_SYSTEM)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Final synthesis failed");
                String::new()
            }
        }
    }

    fn phase(&self, run_id: Uuid, phase: Phase, label: &str, progress: u8) {
        tracing::info!(?phase, progress, "{}", label);
        self.sink.send(RunEvent::Phase {
            run_id,
            phase,
            label: label.to_string(),
            progress,
        });
    }

    fn progress(&self, run_id: Uuid, progress: u8) {
        self.sink.send(RunEvent::Progress { run_id, progress });
    }

    fn push_result(&self, run_id: Uuid, result: &PhaseResult) {
        self.sink.send(RunEvent::Result {
            run_id,
            result: result.clone(),
        });
    }

    fn complete(
        &self,
        run_id: Uuid,
        request: &RunRequest,
        num_members: usize,
        results: &[PhaseResult],
        sources: Vec<String>,
        votes: Vec<Vote>,
    ) {
        self.phase(run_id, Phase::Done, "Complete", 100);
        self.sink.send(RunEvent::Finished { run_id });

        self.recorder.run_completed(&CompletedRun {
            timestamp: chrono::Utc::now().to_rfc3339(),
            topic: request.topic.clone(),
            mode: request.mode,
            num_members,
            results: results.to_vec(),
            sources,
            votes,
        });
        tracing::info!(topic = %request.topic, "Research run complete");
    }
}

/// One analyst's task. Sees only immutable copies of the run's findings.
async fn analyze(
    llm: &dyn LLMClient,
    spec: &AnalystSpec,
    topic: &str,
    narrative: &str,
    sources: &[String],
) -> Result<AnalysisResult> {
    tracing::info!(analyst = %spec.name, chars = narrative.len(), sources = sources.len(), "Analyzing");

    let system = format!(
        r#"You are {name}, a counsel member with expertise in {perspective}.
IMPORTANT RULES - FOLLOW STRICTLY:
- Base your ENTIRE analysis ONLY on the provided research findings and sources.
- Stay strictly on-topic: discuss ONLY {topic}. Do NOT introduce unrelated topics, examples, or diversions.
- Weigh in on the meaning and implications of the research from your perspective.
- Reference key points as coming from the gathered sources (e.g. 'Based on the researched data...') without listing URLs or specific sources.
- Be concise: 2-4 paragraphs of insightful analysis.
- No hallucinations: do not add information that is not in the research.
- Do not focus on one platform from the research; use everything that was found.
- If the research lacks information for your perspective, state that clearly."#,
        name = spec.name,
        perspective = spec.perspective,
        topic = topic,
    );

    let prompt = format!(
        r#"Topic: {topic}

Research Findings (gathered from {count} sources):
{narrative}

Based solely on this research, provide your expert opinion from the {perspective} viewpoint.
What is the meaning of these findings? Key insights? Implications? Always tie back to the provided research data."#,
        topic = topic,
        count = sources.len(),
        narrative = narrative,
        perspective = spec.perspective,
    );

    let content = llm
        .generate(&spec.model, &prompt, Some(&system))
        .await
        .map_err(|e| AppError::LLM(format!("{} failed: {}", spec.name, e)))?;

    Ok(AnalysisResult {
        agent_name: spec.name.clone(),
        perspective: spec.perspective.clone(),
        content,
        timestamp: timestamp_label(),
    })
}

/// Counsel entry for a completed analysis, stamped with the analysis time.
fn counsel_result(analysis: &AnalysisResult) -> PhaseResult {
    let mut result = PhaseResult::new(
        ResultKind::Counsel,
        analysis.agent_name.clone(),
        analysis.content.clone(),
    )
    .with_perspective(analysis.perspective.clone());
    result.timestamp = analysis.timestamp.clone();
    result
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_analysts_cycles_perspectives() {
        let analysts = build_analysts(8, "llama3.2");
        assert_eq!(analysts.len(), 8);
        assert_eq!(analysts[0].name, "Analyst Alpha");
        assert_eq!(analysts[0].perspective, "critical analysis and skepticism");
        assert_eq!(analysts[5].name, "Analyst Zeta");
        assert_eq!(analysts[6].name, "Analyst Alpha 2");
        assert_eq!(analysts[6].perspective, analysts[0].perspective);
        assert_eq!(analysts[7].name, "Analyst Beta 2");
        assert!(analysts.iter().all(|a| a.model == "llama3.2"));
    }

    #[test]
    fn test_build_analysts_names_are_unique() {
        let analysts = build_analysts(20, "m");
        let mut names: Vec<&str> = analysts.iter().map(|a| a.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 20);
    }

    #[test]
    fn test_counsel_result_keeps_analysis_details() {
        let analysis = AnalysisResult {
            agent_name: "Analyst Gamma".to_string(),
            perspective: "practical applications and implementation".to_string(),
            content: "Rooftop panels pay back within a decade.".to_string(),
            timestamp: "09:15:00".to_string(),
        };
        let result = counsel_result(&analysis);
        assert_eq!(result.kind, ResultKind::Counsel);
        assert_eq!(result.agent, "Analyst Gamma");
        assert_eq!(
            result.perspective.as_deref(),
            Some("practical applications and implementation")
        );
        assert_eq!(result.content, analysis.content);
        assert_eq!(result.timestamp, "09:15:00");
        assert!(result.sources.is_empty());
        assert!(result.votes.is_none());
    }

    #[test]
    fn test_excerpt_is_char_based() {
        assert_eq!(excerpt("résumé", 3), "rés");
        assert_eq!(excerpt("ab", 10), "ab");
    }
}
