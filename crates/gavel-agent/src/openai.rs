//! Chat-completions advisor.
//!
//! Speaks the OpenAI chat-completions HTTP API. The API key is resolved once
//! by the caller and handed in; nothing here reads the environment.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::advisory::{AdvisoryError, AdvisoryRequest, Advisor};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str = "You advise an automated bidder in a repeated sealed-bid \
                             auction. Answer with a single number and nothing else.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Advisor backed by a chat-completions model.
#[derive(Clone)]
pub struct OpenAiAdvisor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl std::fmt::Debug for OpenAiAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdvisor")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdvisor {
    /// Creates an advisor for the given key and model.
    ///
    /// `request_timeout` bounds every HTTP request at the transport level, in
    /// addition to the per-decision deadline agents apply.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, AdvisoryError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AdvisoryError::Unavailable("empty API key".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AdvisoryError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Point the advisor at a different endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Model name in use.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a trivial request to check the key and connectivity.
    pub async fn probe(&self, deadline: Duration) -> Result<(), AdvisoryError> {
        let request = AdvisoryRequest {
            agent: "probe".to_string(),
            prompt: "Reply with 1.0".to_string(),
        };
        tokio::time::timeout(deadline, self.complete(&request))
            .await
            .map_err(|_| AdvisoryError::Timeout(deadline))??;
        info!(model = %self.model, "advisory service reachable");
        Ok(())
    }

    async fn complete(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisoryError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisoryError::Unavailable(format!("HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Malformed(format!("invalid response body: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AdvisoryError::Malformed("response has no content".to_string()))?;

        debug!(agent = %request.agent, model = %self.model, "advisory completion received");
        Ok(content)
    }
}

#[async_trait]
impl Advisor for OpenAiAdvisor {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        self.complete(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        let err = OpenAiAdvisor::new("  ", DEFAULT_MODEL, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, AdvisoryError::Unavailable(_)));
    }

    #[test]
    fn debug_output_hides_key() {
        let advisor = OpenAiAdvisor::new("sk-secret", DEFAULT_MODEL, Duration::from_secs(1)).unwrap();
        let debug = format!("{advisor:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4"));
    }

    #[test]
    fn chat_request_serializes_messages() {
        let body = ChatRequest {
            model: "gpt-4",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn chat_response_parses_content() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"1.05"}}]}"#)
                .unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("1.05"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let advisor = OpenAiAdvisor::new("sk-test", DEFAULT_MODEL, Duration::from_secs(2))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/v1/chat/completions");
        let request = AdvisoryRequest {
            agent: "a".into(),
            prompt: "p".into(),
        };
        let err = advisor.advise(&request).await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Unavailable(_)));
    }
}
