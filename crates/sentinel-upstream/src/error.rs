use thiserror::Error;

/// Errors returned by the authority and insight clients.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No API key is configured; no request was sent.
    #[error("{service} API key is not configured")]
    MissingCredentials { service: &'static str },

    #[error("{service} returned HTTP {status}")]
    UnexpectedStatus { service: &'static str, status: u16 },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("completion response contained no text")]
    EmptyCompletion,

    #[error("invalid endpoint \"{url}\": {reason}")]
    InvalidEndpoint { url: String, reason: String },
}
