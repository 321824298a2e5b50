//! Natural-language summaries of an analysis.
//!
//! [`InsightClient`] talks to any OpenAI-compatible chat-completions endpoint.
//! [`fallback_insight`] produces the deterministic text used whenever the
//! backend is unavailable.

use std::fmt::Write as _;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;

const SERVICE: &str = "insight";

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl InsightSettings {
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        Self {
            model: model.to_owned(),
            temperature: 0.5,
            max_tokens: 150,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct InsightClient {
    client: Client,
    api_key: Option<String>,
    endpoint: Url,
    settings: InsightSettings,
}

impl InsightClient {
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidEndpoint`] if `endpoint` does not
    /// parse, or [`UpstreamError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        api_key: Option<String>,
        endpoint: &str,
        settings: InsightSettings,
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
            settings,
        })
    }

    /// Sends `prompt` as a single user message and returns the first choice's
    /// text, trimmed.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::MissingCredentials`] when no API key is configured.
    /// - [`UpstreamError::UnexpectedStatus`] on a non-2xx response.
    /// - [`UpstreamError::Http`] on network failure or timeout.
    /// - [`UpstreamError::Deserialize`] if the body does not match the
    ///   chat-completions shape.
    /// - [`UpstreamError::EmptyCompletion`] if no non-blank text came back.
    pub async fn complete(&self, prompt: &str) -> Result<String, UpstreamError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(UpstreamError::MissingCredentials { service: SERVICE });
        };
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            UpstreamError::InvalidEndpoint {
                url: self.endpoint.to_string(),
                reason: format!("API key is not a valid header value: {e}"),
            }
        })?;

        let request = ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            top_p: 1.0,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, bearer)
            .json(&request)
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
        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
                context: format!("chat completion from {}", self.endpoint),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .ok_or(UpstreamError::EmptyCompletion)
    }
}

/// Builds the consultant-style prompt sent to the text-generation backend.
#[must_use]
pub fn insight_prompt(
    domain: &str,
    domain_authority: i32,
    blended_score: u8,
    failed_signals: &[&str],
) -> String {
    let mut prompt =
        String::from("Act as a Senior SEO Consultant. Analyze this website profile:\n");
    let _ = writeln!(prompt, "Domain: {domain}");
    let _ = writeln!(prompt, "Moz Domain Authority: {domain_authority}");
    let _ = writeln!(prompt, "Spam Score: {blended_score}/100");
    let _ = writeln!(prompt, "Failed Technical Signals: {}", failed_signals.join(", "));
    prompt.push_str(
        "\nProvide a concise 2-sentence strategic summary.\n\
         1. Is this site safe to link to?\n\
         2. What is the single biggest fix needed?\n",
    );
    prompt
}

/// Deterministic summary used when the backend cannot answer.
///
/// Chosen in order: no failed signals, blended score above 50, more than five
/// failed signals, otherwise stable.
#[must_use]
pub fn fallback_insight(domain: &str, blended_score: u8, failed_signals: &[&str]) -> String {
    match failed_signals {
        [] => format!(
            "{domain} shows exceptional technical health: no risk signals were detected and it \
             looks safe to link to."
        ),
        _ if blended_score > 50 => {
            let worst = &failed_signals[..failed_signals.len().min(2)];
            let verb = if worst.len() == 1 { "is" } else { "are" };
            format!(
                "{domain} shows signs of critical toxicity with a spam score of \
                 {blended_score}/100. Avoid linking to it until {} {verb} resolved.",
                worst.join(" and ")
            )
        }
        _ if failed_signals.len() > 5 => format!(
            "{domain} carries moderate risk with {} failed checks. Fix the high-severity \
             issues before building links to it.",
            failed_signals.len()
        ),
        [first] => format!(
            "{domain} is generally stable with 1 minor issue. Addressing {first} would \
             strengthen it further."
        ),
        [first, ..] => format!(
            "{domain} is generally stable with {} minor issues. Addressing {first} would \
             strengthen it further.",
            failed_signals.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_profile_fields() {
        let prompt = insight_prompt("example.com", 42, 61, &["No Favicon", "Thin Content"]);
        assert!(prompt.starts_with("Act as a Senior SEO Consultant."));
        assert!(prompt.contains("Domain: example.com\n"));
        assert!(prompt.contains("Moz Domain Authority: 42\n"));
        assert!(prompt.contains("Spam Score: 61/100\n"));
        assert!(prompt.contains("Failed Technical Signals: No Favicon, Thin Content\n"));
        assert!(prompt.contains("2-sentence strategic summary"));
    }

    #[test]
    fn fallback_for_clean_site_is_exceptional() {
        let text = fallback_insight("example.com", 80, &[]);
        assert!(text.contains("exceptional"), "{text}");
    }

    #[test]
    fn fallback_for_high_score_names_two_signals() {
        let text = fallback_insight(
            "spam.example",
            64,
            &["Poison Content", "Obfuscated Scripts", "Auto-Redirects"],
        );
        assert!(text.contains("critical toxicity"), "{text}");
        assert!(text.contains("Poison Content and Obfuscated Scripts"), "{text}");
        assert!(!text.contains("Auto-Redirects"), "{text}");
    }

    #[test]
    fn fallback_agrees_with_signal_count() {
        let one = fallback_insight("spam.example", 70, &["No Favicon"]);
        assert!(one.contains("until No Favicon is resolved."), "{one}");

        let two = fallback_insight("spam.example", 70, &["No Favicon", "Thin Content"]);
        assert!(two.contains("until No Favicon and Thin Content are resolved."), "{two}");

        let minor = fallback_insight("example.com", 20, &["No Favicon"]);
        assert!(minor.contains("with 1 minor issue."), "{minor}");

        let minors = fallback_insight("example.com", 20, &["No Favicon", "No Canonical"]);
        assert!(minors.contains("with 2 minor issues."), "{minors}");
    }

    #[test]
    fn fallback_for_many_failures_is_moderate() {
        let failed = ["a", "b", "c", "d", "e", "f"];
        let text = fallback_insight("example.com", 40, &failed);
        assert!(text.contains("moderate risk"), "{text}");
    }

    #[test]
    fn fallback_for_few_failures_is_stable() {
        let text = fallback_insight("example.com", 20, &["No Favicon"]);
        assert!(text.contains("generally stable"), "{text}");
        assert!(text.contains("No Favicon"), "{text}");
    }

    #[test]
    fn score_of_exactly_50_is_not_critical() {
        let text = fallback_insight("example.com", 50, &["No Favicon"]);
        assert!(!text.contains("critical"), "{text}");
    }

    #[test]
    fn default_settings_match_backend_expectations() {
        let settings = InsightSettings::for_model("llama-3.3-70b-versatile");
        assert_eq!(settings.max_tokens, 150);
        assert!((settings.temperature - 0.5).abs() < f32::EPSILON);
    }
}
