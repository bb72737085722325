//! Topic search with graceful degradation
//!
//! [`WebSearch`] resolves a topic to seed URLs by trying, in order:
//! 1. the DuckDuckGo instant-answer API (related topics),
//! 2. the DuckDuckGo HTML results page,
//! 3. a curated list of reference-site search URLs built from the topic.
//!
//! Transport and parse failures are logged and treated as "zero results",
//! so a search never fails and never comes back empty.

use crate::types::{SearchHit, SearchResult};
use crate::utils::toml_config::SearchConfig;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Resolves a topic to an ordered list of candidate pages.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return at most `max_results` results. Implementations swallow their
    /// own transport errors.
    async fn search(&self, topic: &str, max_results: usize) -> Vec<SearchResult>;
}

/// DuckDuckGo-backed search with a curated fallback.
pub struct WebSearch {
    http: reqwest::Client,
    api_url: String,
    html_url: String,
}

impl WebSearch {
    /// Build a search client from configuration.
    pub fn new(config: &SearchConfig) -> crate::types::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                crate::types::AppError::Configuration(format!("Failed to build search client: {}", e))
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            html_url: config.html_url.clone(),
        })
    }

    async fn search_api(&self, topic: &str, max_results: usize) -> crate::types::Result<Vec<SearchHit>> {
        let response = self
            .http
            .get(&self.api_url)
            .query(&[("q", topic), ("format", "json"), ("no_html", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: Value = response.json().await?;
        Ok(parse_api_response(&body, max_results))
    }

    async fn search_html(&self, topic: &str, max_results: usize) -> crate::types::Result<Vec<SearchHit>> {
        let response = self
            .http
            .get(&self.html_url)
            .query(&[("q", topic)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body = response.text().await?;
        Ok(parse_html_results(&body, max_results))
    }
}

#[async_trait]
impl SearchProvider for WebSearch {
    async fn search(&self, topic: &str, max_results: usize) -> Vec<SearchResult> {
        tracing::info!(topic, "Searching");

        match self.search_api(topic, max_results).await {
            Ok(hits) if !hits.is_empty() => {
                tracing::info!(count = hits.len(), "Found results via instant-answer API");
                return hits.into_iter().map(SearchResult::from).collect();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Instant-answer search failed"),
        }

        match self.search_html(topic, max_results).await {
            Ok(hits) if !hits.is_empty() => {
                tracing::info!(count = hits.len(), "Found results via HTML search");
                return hits.into_iter().map(SearchResult::from).collect();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "HTML search failed"),
        }

        tracing::info!("Using curated sources");
        curated_sources(topic, max_results)
            .into_iter()
            .map(SearchResult::from)
            .collect()
    }
}

/// Pull `RelatedTopics` entries that carry a `FirstURL`, flattening topic
/// groups, up to `max_results`.
pub fn parse_api_response(body: &Value, max_results: usize) -> Vec<SearchHit> {
    fn collect(topics: &[Value], out: &mut Vec<SearchHit>, max_results: usize) {
        for topic in topics {
            if out.len() >= max_results {
                return;
            }
            if let Some(url) = topic.get("FirstURL").and_then(Value::as_str) {
                out.push(SearchHit::Api {
                    text: topic
                        .get("Text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    first_url: url.to_string(),
                });
            } else if let Some(nested) = topic.get("Topics").and_then(Value::as_array) {
                collect(nested, out, max_results);
            }
        }
    }

    let mut hits = Vec::new();
    if let Some(topics) = body.get("RelatedTopics").and_then(Value::as_array) {
        collect(topics, &mut hits, max_results);
    }
    hits
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse DuckDuckGo HTML result blocks.
pub fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);

    let blocks: Vec<ElementRef<'_>> = ["div.result", "div.results_links", "div.web-result"]
        .iter()
        .filter_map(|css| selector(css))
        .map(|sel| doc.select(&sel).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default();

    let link_selectors: Vec<Selector> = ["a.result__a", "a.result__url", "a"]
        .iter()
        .filter_map(|css| selector(css))
        .collect();
    let snippet_selector = selector(".result__snippet");

    let mut hits = Vec::new();
    for block in blocks.into_iter().take(max_results) {
        let Some(link) = link_selectors
            .iter()
            .find_map(|sel| block.select(sel).next())
        else {
            continue;
        };

        let Some(href) = link.value().attr("href").and_then(normalize_result_href) else {
            continue;
        };

        let snippet = snippet_selector
            .as_ref()
            .and_then(|sel| block.select(sel).next())
            .map(element_text)
            .unwrap_or_default();

        hits.push(SearchHit::Html {
            title: element_text(link),
            href,
            snippet,
        });
    }
    hits
}

/// Make result hrefs absolute and unwrap DuckDuckGo redirect links.
/// Returns `None` for anything that is not an http(s) URL.
fn normalize_result_href(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with("http") {
        href.to_string()
    } else {
        return None;
    };

    let parsed = Url::parse(&absolute).ok()?;
    if parsed.path().starts_with("/l/") {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            if target.starts_with("http") {
                return Some(target.into_owned());
            }
        }
    }

    Some(absolute)
}

/// Deterministic reference-site searches for `topic`. Never empty.
pub fn curated_sources(topic: &str, max_results: usize) -> Vec<SearchHit> {
    let encoded: String = url::form_urlencoded::byte_serialize(topic.as_bytes()).collect();
    let lower = topic.to_lowercase();

    let mut sources = vec![
        (
            format!("{} - Wikipedia", topic),
            format!("https://en.wikipedia.org/w/index.php?search={}", encoded),
            format!("Wikipedia search for {}", topic),
        ),
        (
            format!("Academic research on {}", topic),
            format!("https://scholar.google.com/scholar?q={}", encoded),
            format!("Scholarly articles about {}", topic),
        ),
        (
            format!("{} - Britannica", topic),
            format!("https://www.britannica.com/search?query={}", encoded),
            "Encyclopedia search".to_string(),
        ),
        (
            format!("{} discussions", topic),
            format!("https://www.reddit.com/search/?q={}", encoded),
            "Community discussions".to_string(),
        ),
    ];

    if lower.contains("code") || lower.contains("programming") {
        sources.push((
            format!("{} - Stack Overflow", topic),
            format!("https://stackoverflow.com/search?q={}", encoded),
            "Programming Q&A".to_string(),
        ));
        sources.push((
            format!("{} - GitHub", topic),
            format!("https://github.com/search?q={}", encoded),
            "Code repositories".to_string(),
        ));
    }

    sources
        .into_iter()
        .take(max_results.max(1))
        .map(|(title, url, snippet)| SearchHit::Curated {
            title,
            url,
            snippet,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(hits: Vec<SearchHit>) -> Vec<String> {
        hits.into_iter().map(|h| SearchResult::from(h).url).collect()
    }

    #[test]
    fn test_curated_sources_general_topic() {
        let hits = curated_sources("solar power", 10);
        let urls = urls(hits);
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[0], "https://en.wikipedia.org/w/index.php?search=solar+power");
        assert!(urls.iter().any(|u| u.contains("scholar.google.com")));
        assert!(urls.iter().any(|u| u.contains("reddit.com")));
        assert!(!urls.iter().any(|u| u.contains("github.com")));
    }

    #[test]
    fn test_curated_sources_code_topic_adds_developer_sites() {
        let urls = urls(curated_sources("Rust programming", 10));
        assert_eq!(urls.len(), 6);
        assert!(urls.iter().any(|u| u.starts_with("https://stackoverflow.com/")));
        assert!(urls.iter().any(|u| u.starts_with("https://github.com/")));
    }

    #[test]
    fn test_curated_sources_respects_max_but_never_empty() {
        assert_eq!(curated_sources("solar", 2).len(), 2);
        assert_eq!(curated_sources("solar", 0).len(), 1);
    }

    #[test]
    fn test_parse_api_response_flattens_groups() {
        let body = json!({
            "RelatedTopics": [
                {"Text": "Solar power - energy from the sun", "FirstURL": "https://duckduckgo.com/Solar_power"},
                {"Name": "See also", "Topics": [
                    {"Text": "Photovoltaics", "FirstURL": "https://duckduckgo.com/Photovoltaics"}
                ]},
                {"Text": "no url here"}
            ]
        });
        let hits = parse_api_response(&body, 10);
        assert_eq!(
            urls(hits),
            vec![
                "https://duckduckgo.com/Solar_power",
                "https://duckduckgo.com/Photovoltaics"
            ]
        );
        assert_eq!(parse_api_response(&body, 1).len(), 1);
        assert!(parse_api_response(&json!({}), 5).is_empty());
    }

    #[test]
    fn test_parse_html_results() {
        let html = r#"
            <html><body>
              <div class="result results_links">
                <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fsolar&rut=abc">Solar   Example</a>
                <a class="result__snippet">Sun to <b>power</b></a>
              </div>
              <div class="result">
                <a class="result__a" href="https://energy.example/pv">PV guide</a>
              </div>
              <div class="result">
                <a class="result__a" href="/relative/skip">Skipped</a>
              </div>
            </body></html>
        "#;
        let results: Vec<SearchResult> = parse_html_results(html, 10)
            .into_iter()
            .map(SearchResult::from)
            .collect();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/solar");
        assert_eq!(results[0].title, "Solar Example");
        assert_eq!(results[0].snippet, "Sun to power");
        assert_eq!(results[1].url, "https://energy.example/pv");
        assert_eq!(results[1].snippet, "");
    }

    #[test]
    fn test_normalize_result_href() {
        assert_eq!(
            normalize_result_href("//example.com/page").as_deref(),
            Some("https://example.com/page")
        );
        assert_eq!(normalize_result_href("javascript:void(0)"), None);
        assert_eq!(
            normalize_result_href("http://plain.example").as_deref(),
            Some("http://plain.example")
        );
    }
}
