//! Page retrieval and main-content extraction
//!
//! [`HttpPageFetcher`] downloads a page, drops non-content markup, extracts
//! the text of the most specific content region it can find and collects
//! same-site outbound links. HTTP 429 responses are retried after a fixed
//! back-off; every attempt, rate-limited or not, spends the retry budget.

use crate::types::Page;
use crate::utils::toml_config::FetchConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Subtrees whose text and links never count as page content.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript",
];

/// Content regions, most specific first. `body` and the whole document are
/// the final fallbacks.
const CONTENT_SELECTORS: &[&str] = &["main", "[role=\"main\"]", "article"];

/// Class fragments marking a generic content `div`.
const CONTENT_CLASS_HINTS: &[&str] = &["content", "main", "body", "article"];

/// Retrieves a page's main text and same-site links.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `None` when the page could not be retrieved. Never errors.
    async fn fetch(&self, url: &str) -> Option<Page>;
}

/// reqwest-backed fetcher with rate-limit aware retries.
pub struct HttpPageFetcher {
    http: reqwest::Client,
    config: FetchConfig,
}

impl HttpPageFetcher {
    /// Build a fetcher from configuration.
    pub fn new(config: FetchConfig, user_agent: &str) -> crate::types::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| {
                crate::types::AppError::Configuration(format!("Failed to build fetch client: {}", e))
            })?;
        Ok(Self { http, config })
    }

    /// Fetch with explicit limits: at most `retries` requests are issued and
    /// the extracted text is cut to `max_length` characters.
    pub async fn fetch_with(&self, url: &str, max_length: usize, retries: u32) -> Option<Page> {
        let rate_limit_backoff = Duration::from_millis(self.config.rate_limit_backoff_ms);
        let error_backoff = Duration::from_millis(self.config.error_backoff_ms);

        for attempt in 1..=retries {
            let last_attempt = attempt == retries;
            tracing::debug!(url, attempt, "Fetching");

            let response = match self.http.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "Fetch failed");
                    if !last_attempt {
                        tokio::time::sleep(error_backoff).await;
                    }
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(url, attempt, backoff_ms = self.config.rate_limit_backoff_ms, "Rate limited");
                if !last_attempt {
                    tokio::time::sleep(rate_limit_backoff).await;
                }
                continue;
            }

            if !status.is_success() {
                tracing::warn!(url, status = status.as_u16(), "Unexpected status");
                return None;
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(url, attempt, error = %e, "Failed to read body");
                    if !last_attempt {
                        tokio::time::sleep(error_backoff).await;
                    }
                    continue;
                }
            };

            let page = extract_page(&body, url, max_length, self.config.max_links);
            tracing::info!(
                url,
                chars = page.content.chars().count(),
                links = page.links.len(),
                "Extracted page"
            );
            return Some(page);
        }

        tracing::warn!(url, retries, "Giving up after exhausting retries");
        None
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Option<Page> {
        self.fetch_with(url, self.config.max_length, self.config.retries)
            .await
    }
}

/// Extract the main text and same-site links from `html` served at `page_url`.
pub fn extract_page(html: &str, page_url: &str, max_length: usize, max_links: usize) -> Page {
    let doc = Html::parse_document(html);

    let region = content_region(&doc);
    let mut raw = String::new();
    match region {
        Some(el) => collect_text(el, &mut raw),
        None => collect_text(doc.root_element(), &mut raw),
    }

    Page {
        content: truncate_chars(&collapse_whitespace(&raw), max_length),
        links: same_site_links(&doc, page_url, max_links),
    }
}

fn content_region(doc: &Html) -> Option<ElementRef<'_>> {
    for css in CONTENT_SELECTORS {
        if let Ok(sel) = Selector::parse(css) {
            if let Some(el) = doc.select(&sel).next() {
                return Some(el);
            }
        }
    }

    if let Ok(sel) = Selector::parse("div[class]") {
        let hinted = doc.select(&sel).find(|el| {
            el.value()
                .classes()
                .any(|class| CONTENT_CLASS_HINTS.iter().any(|hint| class.contains(hint)))
        });
        if hinted.is_some() {
            return hinted;
        }
    }

    Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
}

fn collect_text(el: ElementRef<'_>, buf: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                buf.push_str(text);
                buf.push(' ');
            }
            Node::Element(element) => {
                if SKIP_TAGS.contains(&element.name()) {
                    continue;
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, buf);
                }
            }
            _ => {}
        }
    }
}

fn inside_skipped_subtree(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| SKIP_TAGS.contains(&ancestor.value().name()))
}

fn same_site_links(doc: &Html, page_url: &str, max_links: usize) -> Vec<String> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for a in doc.select(&anchor) {
        if links.len() >= max_links {
            break;
        }
        if inside_skipped_subtree(&a) {
            continue;
        }
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        if resolved.host_str() != base.host_str()
            || resolved.port_or_known_default() != base.port_or_known_default()
        {
            continue;
        }

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
