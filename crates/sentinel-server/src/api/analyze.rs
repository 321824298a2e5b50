use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use sentinel_analysis::{AnalysisResult, AnalyzeError, BatchError, Caller, ResultMetrics};
use sentinel_signals::Signal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnalyzeRequest {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Single-analysis payload. Status and cache flags are batch-only.
#[derive(Debug, Serialize)]
pub(super) struct AnalyzeResponse {
    domain: String,
    metrics: ResultMetrics,
    signals: Vec<Signal>,
    insight: String,
}

impl From<AnalysisResult> for AnalyzeResponse {
    fn from(result: AnalysisResult) -> Self {
        Self {
            domain: result.domain,
            metrics: result.metrics,
            signals: result.signals,
            insight: result.insight,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BulkAnalyzeRequest {
    #[serde(default)]
    urls: Value,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkAnalyzeResponse {
    results: Vec<AnalysisResult>,
}

pub(super) async fn analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = body.map_err(|e| reject_body(&req_id, &e))?;

    let caller = match non_blank(request.user_id) {
        Some(id) => Caller::Member(id),
        None => Caller::Guest(guest_key(&headers)),
    };
    let url = request.url.unwrap_or_default();

    let result = state
        .analyzer
        .analyze_single(&url, &caller)
        .await
        .map_err(|e| map_analyze_error(&req_id.0, &e))?;

    Ok(Json(result.into()))
}

pub(super) async fn bulk_analyze(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<BulkAnalyzeRequest>, JsonRejection>,
) -> Result<Json<BulkAnalyzeResponse>, ApiError> {
    let Json(request) = body.map_err(|e| reject_body(&req_id, &e))?;

    // A malformed list is reported after the caller check, as an empty one.
    let urls = url_list(&request.urls).unwrap_or_default();
    let caller_id = non_blank(request.user_id);

    let results = state
        .analyzer
        .analyze_batch(caller_id.as_deref(), &urls)
        .await
        .map_err(|e| map_batch_error(&req_id.0, &e))?;

    Ok(Json(BulkAnalyzeResponse { results }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn url_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}

/// Anonymous caller identity: hex SHA-256 of the first forwarded client
/// address, then `x-real-ip`, then the literal `unknown`.
pub(super) fn guest_key(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let client = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown");

    format!("{:x}", Sha256::digest(client.as_bytes()))
}

fn reject_body(req_id: &RequestId, rejection: &JsonRejection) -> ApiError {
    tracing::debug!(request_id = %req_id.0, error = %rejection, "rejected request body");
    ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body")
}

/// Unreachable targets echo the target's error status, else 502.
fn upstream_status(status: Option<u16>) -> StatusCode {
    status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

pub(super) fn map_analyze_error(request_id: &str, error: &AnalyzeError) -> ApiError {
    match error {
        AnalyzeError::MissingUrl | AnalyzeError::InvalidUrl(_) => {
            ApiError::new(StatusCode::BAD_REQUEST, error.to_string())
        }
        AnalyzeError::GuestLimitReached { .. } => {
            ApiError::new(StatusCode::FORBIDDEN, error.to_string()).requiring_login()
        }
        AnalyzeError::Unreachable { status, .. } => {
            ApiError::new(upstream_status(*status), error.to_string())
        }
        AnalyzeError::Store(e) => {
            tracing::error!(request_id, error = %e, "guest ledger unavailable");
            ApiError::internal()
        }
    }
}

pub(super) fn map_batch_error(request_id: &str, error: &BatchError) -> ApiError {
    let status = match error {
        BatchError::MissingCaller => StatusCode::UNAUTHORIZED,
        BatchError::InvalidList | BatchError::TooManyDomains { .. } => StatusCode::BAD_REQUEST,
        BatchError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
        BatchError::UnknownCaller => StatusCode::NOT_FOUND,
        BatchError::Store(e) => {
            tracing::error!(request_id, error = %e, "bulk ledger unavailable");
            return ApiError::internal();
        }
    };
    ApiError::new(status, error.to_string())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn sha256_hex(input: &str) -> String {
        format!("{:x}", Sha256::digest(input.as_bytes()))
    }

    #[test]
    fn guest_key_uses_first_forwarded_hop() {
        let key = guest_key(&headers(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "10.0.0.9"),
        ]));
        assert_eq!(key, sha256_hex("203.0.113.7"));
        assert_eq!(key.len(), 64);
    }

    #[test]
    fn guest_key_falls_back_to_real_ip_then_unknown() {
        assert_eq!(
            guest_key(&headers(&[("x-real-ip", "198.51.100.4")])),
            sha256_hex("198.51.100.4")
        );
        assert_eq!(
            guest_key(&headers(&[("x-forwarded-for", " ")])),
            sha256_hex("unknown")
        );
        assert_eq!(guest_key(&HeaderMap::new()), sha256_hex("unknown"));
    }

    #[test]
    fn url_list_requires_an_array_of_strings() {
        assert_eq!(
            url_list(&serde_json::json!(["a.com", "b.com"])),
            Some(vec!["a.com".to_owned(), "b.com".to_owned()])
        );
        assert_eq!(url_list(&serde_json::json!(["a.com", 3])), None);
        assert_eq!(url_list(&serde_json::json!("a.com")), None);
        assert_eq!(url_list(&Value::Null), None);
    }

    #[test]
    fn unreachable_status_passes_through_error_codes_only() {
        assert_eq!(upstream_status(Some(404)), StatusCode::NOT_FOUND);
        assert_eq!(upstream_status(Some(503)), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(upstream_status(Some(302)), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream_status(None), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn batch_errors_map_to_statuses() {
        let cases = [
            (BatchError::MissingCaller, StatusCode::UNAUTHORIZED),
            (BatchError::InvalidList, StatusCode::BAD_REQUEST),
            (BatchError::TooManyDomains { max: 25 }, StatusCode::BAD_REQUEST),
            (
                BatchError::QuotaExceeded { used: 490, cap: 500 },
                StatusCode::FORBIDDEN,
            ),
            (BatchError::UnknownCaller, StatusCode::NOT_FOUND),
        ];
        for (error, expected) in cases {
            assert_eq!(map_batch_error("req", &error).status, expected, "{error}");
        }
    }
}
