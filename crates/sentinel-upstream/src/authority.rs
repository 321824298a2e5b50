//! Client for the domain-authority metrics provider (DapaChecker-compatible).

use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;

use crate::error::UpstreamError;

const SERVICE: &str = "authority";

/// Authority figures for one hostname. All fields default to zero.
///
/// `spam_score` may be negative when the provider has no data for the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthorityMetrics {
    pub domain_authority: i32,
    pub page_authority: i32,
    pub spam_score: i32,
    pub total_backlinks: i64,
}

#[derive(Serialize)]
struct MetricsRequest<'a> {
    urls: [&'a str; 1],
}

/// Client for the authority provider's bulk-lookup endpoint.
///
/// Without an API key every lookup fails fast with
/// [`UpstreamError::MissingCredentials`] and no request is sent.
pub struct AuthorityClient {
    client: Client,
    api_key: Option<String>,
    endpoint: Url,
}

impl AuthorityClient {
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidEndpoint`] if `endpoint` does not
    /// parse, or [`UpstreamError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        api_key: Option<String>,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let endpoint = Url::parse(endpoint).map_err(|e| UpstreamError::InvalidEndpoint {
            url: endpoint.to_owned(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    /// Looks up authority metrics for a bare hostname.
    ///
    /// An empty `data` array yields all-zero metrics. Individual fields that
    /// are missing or not numeric are read as zero.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::MissingCredentials`] when no API key is configured.
    /// - [`UpstreamError::UnexpectedStatus`] on a non-2xx response.
    /// - [`UpstreamError::Http`] on network failure or timeout.
    /// - [`UpstreamError::Deserialize`] if the body is not JSON.
    pub async fn fetch_metrics(&self, hostname: &str) -> Result<AuthorityMetrics, UpstreamError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(UpstreamError::MissingCredentials { service: SERVICE });
        };
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            UpstreamError::InvalidEndpoint {
                url: self.endpoint.to_string(),
                reason: format!("API key is not a valid header value: {e}"),
            }
        })?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, bearer)
            .json(&MetricsRequest { urls: [hostname] })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::UnexpectedStatus {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let json: Value = serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
            context: format!("authority metrics for {hostname}"),
            source: e,
        })?;

        let metrics = parse_metrics(&json);
        tracing::debug!(
            hostname,
            da = metrics.domain_authority,
            spam_score = metrics.spam_score,
            "authority metrics received"
        );
        Ok(metrics)
    }
}

/// Reads the first entry of the provider's `data` array.
pub(crate) fn parse_metrics(json: &Value) -> AuthorityMetrics {
    let Some(entry) = json
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
    else {
        return AuthorityMetrics::default();
    };

    AuthorityMetrics {
        domain_authority: to_i32(coerce_int(entry.get("site_da"))),
        page_authority: to_i32(coerce_int(entry.get("site_pa"))),
        spam_score: to_i32(coerce_int(entry.get("spam_score"))),
        total_backlinks: coerce_int(entry.get("backlinks")),
    }
}

/// Accepts integers, floats (rounded) and numeric strings; anything else is 0.
#[allow(clippy::cast_possible_truncation)]
fn coerce_int(value: Option<&Value>) -> i64 {
    let from_float = |f: f64| if f.is_finite() { f.round() as i64 } else { 0 };
    match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().map_or(0, from_float)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(from_float))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn to_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}
