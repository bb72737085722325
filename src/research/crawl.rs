use crate::{
    llm::LLMClient,
    research::{
        fetch::{truncate_chars, PageFetcher},
        repair,
        search::SearchProvider,
    },
    types::{FrontierEntry, Page},
    utils::toml_config::CrawlConfig,
};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Narrative returned when search produced no seed URLs.
pub const NO_RESULTS_NARRATIVE: &str = "No search results found.";

const SYNTHESIS_SYSTEM: &str = "You are a research synthesizer. Integrate new information into the existing research summary.
Rules:
1. Use ONLY the new content provided
2. Keep output concise (3-5 paragraphs)
3. NO fake sources or URLs in output, but say what information you are referencing where it helps.
4. Focus on factual synthesis";

const FOLLOWUP_SYSTEM: &str = "Output only valid JSON, no other text.";

const POLISH_SYSTEM: &str = "Create a coherent, factual summary. NO fake sources in the text. \
Do not focus on a single platform: draw on all of the resources provided (encyclopedias, \
academic indexes, discussion forums and the rest).";

/// Insertion-ordered, duplicate-free list of source URLs.
#[derive(Debug, Default)]
struct SourceList {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl SourceList {
    fn push(&mut self, url: &str) -> bool {
        if self.seen.insert(url.to_string()) {
            self.order.push(url.to_string());
            true
        } else {
            false
        }
    }
}

/// State owned by one crawl run.
#[derive(Debug, Default)]
struct CrawlState {
    narrative: String,
    frontier: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    visit_order: Vec<String>,
    sources: SourceList,
    page_count: usize,
}

/// Result of one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Final polished narrative (or [`NO_RESULTS_NARRATIVE`]).
    pub narrative: String,
    /// Every URL seen, deduplicated, in first-discovery order.
    pub sources: Vec<String>,
    /// URLs dequeued and processed, in processing order.
    pub visited: Vec<String>,
    /// Deepest frontier depth that was processed.
    pub max_depth_reached: usize,
}

/// Bounded breadth-first crawl that folds each page into a running narrative.
///
/// The loop is strictly sequential: every fetch and model call for a run
/// completes before the next one starts, because narrative folding is a
/// read-modify-write on the run's state.
pub struct CrawlEngine {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    llm: Arc<dyn LLMClient>,
    config: CrawlConfig,
    search_results: usize,
}

impl CrawlEngine {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        llm: Arc<dyn LLMClient>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            search,
            fetcher,
            llm,
            config,
            search_results: 10,
        }
    }

    /// Number of search results used as depth-1 seeds.
    pub fn with_search_results(mut self, search_results: usize) -> Self {
        self.search_results = search_results;
        self
    }

    /// Crawl for `topic` and return the synthesized narrative and sources.
    pub async fn research(&self, topic: &str, model: &str) -> CrawlOutcome {
        tracing::info!(topic, model, "Starting deep research");

        let seeds = self.search.search(topic, self.search_results).await;
        if seeds.is_empty() {
            tracing::warn!(topic, "Search returned no results");
            return CrawlOutcome {
                narrative: NO_RESULTS_NARRATIVE.to_string(),
                sources: Vec::new(),
                visited: Vec::new(),
                max_depth_reached: 0,
            };
        }

        let mut state = CrawlState::default();
        state.frontier.extend(seeds.into_iter().map(|result| FrontierEntry {
            url: result.url,
            depth: 1,
        }));

        let mut max_depth_reached = 0;

        while state.page_count < self.config.max_pages {
            let Some(entry) = state.frontier.pop_front() else {
                break;
            };

            if state.visited.contains(&entry.url) || entry.depth > self.config.max_depth {
                continue;
            }

            state.visited.insert(entry.url.clone());
            state.visit_order.push(entry.url.clone());
            state.sources.push(&entry.url);
            state.page_count += 1;
            max_depth_reached = max_depth_reached.max(entry.depth);

            tracing::info!(
                page = state.page_count,
                max_pages = self.config.max_pages,
                depth = entry.depth,
                url = %entry.url,
                "Processing page"
            );

            let Some(page) = self.fetcher.fetch(&entry.url).await else {
                continue;
            };

            for link in &page.links {
                state.sources.push(link);
            }

            if let Some(narrative) = self
                .synthesize(topic, model, &state.narrative, &page)
                .await
            {
                state.narrative = narrative;
            }

            if page.links.is_empty() || entry.depth >= self.config.max_depth {
                continue;
            }

            let next_depth = entry.depth + 1;
            for url in self
                .select_followups(topic, model, &state.narrative, &page.links)
                .await
            {
                if url.starts_with("http") && !state.visited.contains(&url) {
                    state.frontier.push_back(FrontierEntry {
                        url,
                        depth: next_depth,
                    });
                }
            }
        }

        if !state.narrative.is_empty() {
            state.narrative = self.polish(topic, model, state.narrative).await;
        }

        tracing::info!(
            pages = state.page_count,
            sources = state.sources.order.len(),
            "Research complete"
        );

        CrawlOutcome {
            narrative: state.narrative,
            sources: state.sources.order,
            visited: state.visit_order,
            max_depth_reached,
        }
    }

    /// Fold one page into the narrative. `None` keeps the previous narrative.
    async fn synthesize(&self, topic: &str, model: &str, narrative: &str, page: &Page) -> Option<String> {
        let current = if narrative.is_empty() {
            "Begin synthesis with this content."
        } else {
            narrative
        };

        let prompt = format!(
            "Topic: {}\nCurrent summary: {}\nNew content: {}\n\nSynthesize this information into the summary.",
            topic,
            current,
            truncate_chars(&page.content, self.config.page_excerpt_chars)
        );

        match self.llm.generate(model, &prompt, Some(SYNTHESIS_SYSTEM)).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis call failed, keeping previous narrative");
                None
            }
        }
    }

    /// Ask the model which of `links` deserve a visit.
    async fn select_followups(
        &self,
        topic: &str,
        model: &str,
        narrative: &str,
        links: &[String],
    ) -> Vec<String> {
        let offered: Vec<&str> = links
            .iter()
            .take(self.config.followup_link_cap)
            .map(String::as_str)
            .collect();

        let prompt = format!(
            "Topic: {}\nSummary: {}\nLinks: {}\n\nSelect 0-20 most relevant URLs for deeper research. \
             Output ONLY JSON: {{\"followups\": [\"url1\", \"url2\"]}}",
            topic,
            truncate_chars(narrative, self.config.followup_summary_chars),
            offered.join(", ")
        );

        match self.llm.generate(model, &prompt, Some(FOLLOWUP_SYSTEM)).await {
            Ok(raw) => repair::string_array(&repair::repair(&raw), "followups"),
            Err(e) => {
                tracing::warn!(error = %e, "Follow-up selection failed");
                Vec::new()
            }
        }
    }

    async fn polish(&self, topic: &str, model: &str, narrative: String) -> String {
        let prompt = format!("Use this research summary on {}: {}", topic, narrative);
        match self.llm.generate(model, &prompt, Some(POLISH_SYSTEM)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Final polish failed, returning unpolished narrative");
                narrative
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_list_keeps_first_occurrence() {
        let mut sources = SourceList::default();
        assert!(sources.push("https://a"));
        assert!(sources.push("https://b"));
        assert!(!sources.push("https://a"));
        assert!(sources.push("https://c"));
        assert_eq!(sources.order, vec!["https://a", "https://b", "https://c"]);
    }
}
