//! The HTTP clients plugged into the analyzer's seams, exercised against a
//! local `wiremock` server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentinel_analysis::{
    AnalysisStatus, Analyzer, AnalyzerSettings, Caller, Collaborators, InsightSource,
    MemoryStore, MetricsSource, PageSource,
};
use sentinel_fetcher::FetchError;
use sentinel_upstream::{
    AuthorityClient, AuthorityMetrics, InsightClient, InsightSettings, UpstreamError,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn authority_client(server: &MockServer, key: Option<&str>) -> AuthorityClient {
    AuthorityClient::new(
        key.map(str::to_owned),
        &format!("{}/api/user/dapa-checker", server.uri()),
        TIMEOUT,
    )
    .expect("client construction should not fail")
}

fn insight_client(server: &MockServer, key: Option<&str>) -> InsightClient {
    InsightClient::new(
        key.map(str::to_owned),
        &format!("{}/openai/v1/chat/completions", server.uri()),
        InsightSettings::for_model("llama-3.3-70b-versatile"),
        TIMEOUT,
    )
    .expect("client construction should not fail")
}

async fn failing_provider(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn provider_error_status_yields_zero_metrics() {
    let server = failing_provider(ResponseTemplate::new(500)).await;
    let client = authority_client(&server, Some("test-key"));

    let metrics = MetricsSource::authority_metrics(&client, "example.com").await;

    assert_eq!(metrics, AuthorityMetrics::default());
}

#[tokio::test]
async fn provider_non_json_body_yields_zero_metrics() {
    let server = failing_provider(
        ResponseTemplate::new(200).set_body_raw("<html>maintenance</html>", "text/html"),
    )
    .await;
    let client = authority_client(&server, Some("test-key"));

    let metrics = MetricsSource::authority_metrics(&client, "example.com").await;

    assert_eq!(metrics, AuthorityMetrics::default());
}

#[tokio::test]
async fn missing_key_yields_zero_metrics_without_calling_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = authority_client(&server, None);

    let metrics = MetricsSource::authority_metrics(&client, "example.com").await;

    assert_eq!(metrics, AuthorityMetrics::default());
}

#[tokio::test]
async fn insight_adapter_forwards_completion_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Safe to link." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = insight_client(&server, Some("groq-key"));

    let text = InsightSource::complete(&client, "Summarize example.com")
        .await
        .expect("completion");

    assert!(text.contains("Safe to link."), "{text}");
}

#[tokio::test]
async fn insight_adapter_reports_missing_key() {
    let server = MockServer::start().await;
    let client = insight_client(&server, None);

    let err = InsightSource::complete(&client, "Summarize example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::MissingCredentials { .. }), "got: {err:?}");
}

struct StaticPage;

#[async_trait]
impl PageSource for StaticPage {
    async fn fetch_page(&self, _url: &str, _timeout: Duration) -> Result<String, FetchError> {
        Ok("<html lang=\"en\"><head><title>Plain test page title</title></head></html>".into())
    }
}

#[tokio::test]
async fn analysis_succeeds_with_zero_authority_when_provider_fails() {
    let authority = failing_provider(ResponseTemplate::new(500)).await;
    let insight = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let analyzer = Analyzer::new(
        Collaborators {
            pages: Arc::new(StaticPage),
            metrics: Arc::new(authority_client(&authority, Some("test-key"))),
            insights: Arc::new(insight_client(&insight, None)),
            cache: store.clone(),
            ledger: store,
        },
        AnalyzerSettings::default(),
    );

    let result = analyzer
        .analyze_single("example.com", &Caller::Member("member-1".into()))
        .await
        .expect("analysis should degrade, not fail");

    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.metrics.da, 0);
    assert_eq!(result.metrics.pa, 0);
    assert_eq!(result.metrics.backlinks, 0);
    assert!(!result.insight.is_empty());
}
