//! HTTP transport tests
//!
//! Exercise the reqwest-backed search, page fetcher and Ollama client
//! against local wiremock servers.

use counsel::llm::{LLMClient, OllamaClient};
use counsel::research::{HttpPageFetcher, PageFetcher, SearchProvider, WebSearch};
use counsel::types::AppError;
use counsel::utils::toml_config::{FetchConfig, SearchConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn search_config(server: &MockServer) -> SearchConfig {
    SearchConfig {
        api_url: format!("{}/", server.uri()),
        html_url: format!("{}/html/", server.uri()),
        timeout_secs: 5,
        ..SearchConfig::default()
    }
}

fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        rate_limit_backoff_ms: 0,
        error_backoff_ms: 0,
        timeout_secs: 5,
        ..FetchConfig::default()
    }
}

// ============= Search =============

#[tokio::test]
async fn test_search_uses_instant_answer_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "solar power"))
        .and(query_param("format", "json"))
        .and(query_param("no_html", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RelatedTopics": [
                {"Text": "Solar power - conversion of sunlight", "FirstURL": "https://duckduckgo.com/Solar_power"},
                {"Name": "Technology", "Topics": [
                    {"Text": "Photovoltaics", "FirstURL": "https://duckduckgo.com/Photovoltaics"}
                ]},
                {"Text": "No link here"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let search = WebSearch::new(&search_config(&server)).unwrap();
    let results = search.search("solar power", 10).await;

    let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://duckduckgo.com/Solar_power", "https://duckduckgo.com/Photovoltaics"]
    );
    assert_eq!(results[0].title, "Solar power - conversion of sunlight");
}

#[tokio::test]
async fn test_search_falls_back_to_html_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"RelatedTopics": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "solar power"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <div class="result">
                  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fenergy.example%2Fsolar&rut=abc">Solar energy</a>
                  <a class="result__snippet">Sunlight to electricity.</a>
                </div>
                <div class="result">
                  <a class="result__a" href="https://wiki.example/Solar">Solar - Wiki</a>
                </div>
              </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let search = WebSearch::new(&search_config(&server)).unwrap();
    let results = search.search("solar power", 10).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "https://energy.example/solar");
    assert_eq!(results[0].title, "Solar energy");
    assert_eq!(results[0].snippet, "Sunlight to electricity.");
    assert_eq!(results[1].url, "https://wiki.example/Solar");
}

#[tokio::test]
async fn test_search_falls_back_to_curated_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let search = WebSearch::new(&search_config(&server)).unwrap();
    let results = search.search("rust programming", 10).await;

    assert_eq!(results.len(), 6);
    assert!(results[0].url.starts_with("https://en.wikipedia.org/"));
    assert!(results.iter().any(|r| r.url.contains("stackoverflow.com")));
    assert!(results.iter().all(|r| r.url.contains("rust+programming")));
}

// ============= Page fetch =============

#[tokio::test]
async fn test_fetch_extracts_main_content_and_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
                <nav><a href="/menu">Menu</a></nav>
                <article>Solar cells <em>convert</em> light. <a href="/cells">Cells</a>
                  <a href="https://elsewhere.example/">Elsewhere</a></article>
              </body></html>"#,
        ))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(fast_fetch_config(), "test-agent").unwrap();
    let page = fetcher
        .fetch(&format!("{}/article", server.uri()))
        .await
        .unwrap();

    assert_eq!(page.content, "Solar cells convert light. Cells Elsewhere");
    assert_eq!(page.links, vec![format!("{}/cells", server.uri())]);
}

#[tokio::test]
async fn test_fetch_gives_up_after_repeated_rate_limits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(fast_fetch_config(), "test-agent").unwrap();
    let page = fetcher.fetch(&format!("{}/busy", server.uri())).await;
    assert!(page.is_none());
}

#[tokio::test]
async fn test_fetch_recovers_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<main>Back online</main>"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(fast_fetch_config(), "test-agent").unwrap();
    let page = fetcher.fetch(&format!("{}/flaky", server.uri())).await.unwrap();
    assert_eq!(page.content, "Back online");
}

#[tokio::test]
async fn test_fetch_does_not_retry_other_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(fast_fetch_config(), "test-agent").unwrap();
    assert!(fetcher.fetch(&format!("{}/missing", server.uri())).await.is_none());
}

#[tokio::test]
async fn test_fetch_with_truncates_to_requested_length() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/long"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("<main>{}</main>", "a".repeat(50))))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(fast_fetch_config(), "test-agent").unwrap();
    let page = fetcher
        .fetch_with(&format!("{}/long", server.uri()), 10, 1)
        .await
        .unwrap();
    assert_eq!(page.content, format!("{}...", "a".repeat(10)));
}

// ============= Ollama =============

#[tokio::test]
async fn test_ollama_generate_sends_model_prompt_and_system() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "prompt": "Summarize solar power",
            "system": "Be brief",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "Solar power turns sunlight into electricity.",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let text = client
        .generate("llama3.2", "Summarize solar power", Some("Be brief"))
        .await
        .unwrap();
    assert_eq!(text, "Solar power turns sunlight into electricity.");
}

#[tokio::test]
async fn test_ollama_non_success_is_llm_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "model not found"})))
        .mount(&server)
        .await;

    let client = OllamaClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    let err = client.generate("missing", "hi", None).await.unwrap_err();
    match err {
        AppError::LLM(message) => assert!(message.contains("missing")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_ollama_lists_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2019393189},
                {"name": "mistral:7b"}
            ]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_models_timeout(Duration::from_secs(1))
        .unwrap();
    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2:latest", "mistral:7b"]);
}

#[tokio::test]
async fn test_ollama_unreachable_models_is_error() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let client = OllamaClient::new(uri, Duration::from_secs(1)).unwrap();
    assert!(client.list_models().await.is_err());
}
