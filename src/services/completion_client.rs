use crate::models::api::{ApiErrorBody, ChatRequest, ChatResponse, Completion};
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong between reading a prompt and recording a
/// query. No variant is fatal; the session stays usable after any of them.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("prompt is empty")]
    MissingPrompt,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected API response ({reason}); raw body: {body}")]
    Parse { reason: String, body: String },

    #[error("the API reported zero tokens for this call")]
    EmptyCompletion,
}

/// One-shot chat-completion client.
///
/// Issues exactly one outbound request per call: no caching, no
/// deduplication, and deliberately no automatic retries. A failed call is
/// reported as an error rather than fabricated data.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CompletionClient {
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self, QueryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| QueryError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Send one prompt and extract generated text plus token counters.
    pub async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, QueryError> {
        if self.api_key.is_empty() {
            return Err(QueryError::MissingCredential);
        }
        if prompt.trim().is_empty() {
            return Err(QueryError::MissingPrompt);
        }

        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("POST {url} (model: {model})");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&ChatRequest::user(model, prompt))
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        if !status.is_success() {
            // Surface the gateway's error message when the body carries one
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(QueryError::Network(format!("HTTP {status}: {detail}")));
        }

        parse_completion(&body)
    }
}

/// Extract text and usage counters from a chat-completion response body.
///
/// Missing or malformed fields are a `Parse` error carrying the raw body
/// for diagnostics, distinct from transport failures.
pub fn parse_completion(body: &str) -> Result<Completion, QueryError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| QueryError::Parse {
        reason: e.to_string(),
        body: body.to_string(),
    })?;

    let choice = parsed.choices.first().ok_or_else(|| QueryError::Parse {
        reason: "missing choices[0].message.content".to_string(),
        body: body.to_string(),
    })?;

    let usage = parsed.usage.as_ref().ok_or_else(|| QueryError::Parse {
        reason: "missing usage object".to_string(),
        body: body.to_string(),
    })?;

    Ok(Completion {
        text: choice.message.content.clone(),
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total(),
    })
}

/// Simulated completion source for development and testing without an
/// API key or network access.
#[derive(Debug, Clone)]
pub struct MockCompletionClient {
    should_fail: bool,
    zero_tokens: bool,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            zero_tokens: false,
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Succeed with an empty completion reporting zero tokens, as some
    /// gateways do on degenerate responses
    pub fn with_zero_tokens(mut self) -> Self {
        self.zero_tokens = true;
        self
    }

    pub async fn complete(&self, model: &str, prompt: &str) -> Result<Completion, QueryError> {
        if self.should_fail {
            return Err(QueryError::Network("simulated network failure".to_string()));
        }
        if prompt.trim().is_empty() {
            return Err(QueryError::MissingPrompt);
        }
        if self.zero_tokens {
            return Ok(Completion {
                text: String::new(),
                input_tokens: 0,
                output_tokens: 0,
                total_tokens: 0,
            });
        }

        use rand::Rng;
        let mut rng = rand::thread_rng();
        let input_tokens = (prompt.len() as u64 / 4).max(1) + rng.gen_range(0..20);
        let output_tokens = rng.gen_range(40..400);

        Ok(Completion {
            text: format!(
                "[simulated {model} response to a {}-character prompt]",
                prompt.len()
            ),
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        })
    }
}

impl Default for MockCompletionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_total_tokens_is_computed_from_parts() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50}
        }"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.input_tokens, 100);
        assert_eq!(completion.output_tokens, 50);
        assert_eq!(completion.total_tokens, 150);
        assert_eq!(completion.text, "hi");
    }

    #[test]
    fn reported_total_tokens_wins() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hi"}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 160}
        }"#;
        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.total_tokens, 160);
    }

    #[test]
    fn missing_choices_is_a_parse_error_with_the_body() {
        let body = r#"{"usage": {"prompt_tokens": 1, "completion_tokens": 1}}"#;
        match parse_completion(body) {
            Err(QueryError::Parse { body: raw, .. }) => assert_eq!(raw, body),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_usage_is_a_parse_error() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#;
        assert!(matches!(
            parse_completion(body),
            Err(QueryError::Parse { .. })
        ));
    }

    #[test]
    fn non_json_body_is_a_parse_error() {
        assert!(matches!(
            parse_completion("<html>gateway timeout</html>"),
            Err(QueryError::Parse { .. })
        ));
    }
}
