use std::time::Duration;

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Url};

use crate::error::FetchError;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Bodies beyond this many bytes are truncated. Well above the 250 KB
/// heavy-page threshold so oversized pages are still flagged.
pub const MAX_BODY_BYTES: usize = 1_000_000;

/// Fetches raw page markup with an identifying `User-Agent`.
///
/// Exactly one attempt is made per call; there is no retry or backoff.
/// Timeouts are chosen per call so single and batch analyses can share one
/// client while applying different budgets.
#[derive(Debug, Clone)]
pub struct HtmlFetcher {
    client: Client,
}

impl HtmlFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Downloads `url` and returns the response body as text, truncated to
    /// [`MAX_BODY_BYTES`].
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - [`FetchError::Timeout`] if the request exceeds `timeout`.
    /// - [`FetchError::UnexpectedStatus`] for any non-2xx response.
    /// - [`FetchError::Http`] for connection, TLS or body-decoding failures.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_owned(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let response = self
            .client
            .get(parsed)
            .header(ACCEPT, HeaderValue::from_static(ACCEPT_HTML))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        if let Some(len) = response.content_length() {
            if u64::try_from(MAX_BODY_BYTES).is_ok_and(|cap| len > cap) {
                tracing::warn!(url, declared = len, "response exceeds body cap; truncating");
            }
        }

        let body = read_capped(response, url).await?;
        tracing::debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

/// Reads at most [`MAX_BODY_BYTES`] of the body. A multi-byte character cut
/// at the boundary decodes to U+FFFD.
async fn read_capped(mut response: reqwest::Response, url: &str) -> Result<String, FetchError> {
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| classify(e, url))? {
        let room = MAX_BODY_BYTES - bytes.len();
        if chunk.len() >= room {
            bytes.extend_from_slice(&chunk[..room]);
            tracing::debug!(url, cap = MAX_BODY_BYTES, "body truncated");
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn classify(error: reqwest::Error, url: &str) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_owned(),
        }
    } else {
        FetchError::Http(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_relative_url_without_network() {
        let fetcher = HtmlFetcher::new("sentinel-test/0.1").unwrap();
        let err = fetcher
            .fetch("example.com/page", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let fetcher = HtmlFetcher::new("sentinel-test/0.1").unwrap();
        let err = fetcher
            .fetch("ftp://example.com/", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }), "got {err:?}");
        assert_eq!(err.status(), None);
    }
}
