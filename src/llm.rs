//! OpenAI-compatible chat-completion client.
//!
//! # Architecture
//!
//! - [`AskAsync`]: the one seam callers depend on, so tests can swap in a fake
//! - [`ChatClient`]: `POST {api_base}/chat/completions` over `reqwest`
//!
//! Each call is a single request with a finite timeout. There is no retry:
//! callers decide what a failure means (the article generator falls back to
//! a raw data dump, the `ask` command exits nonzero).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::config::LlmSettings;
use crate::error::GenerationError;
use crate::utils::truncate_for_log;

/// System role used by the `ask` command.
pub const ASSISTANT_PROMPT: &str = "You are a helpful AI assistant.";

/// Trait for async LLM interaction.
///
/// Implementors send a system instruction plus user text to a model and
/// return its reply.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    async fn ask(&self, system: &str, text: &str) -> Result<Self::Response, GenerationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    settings: LlmSettings,
}

impl ChatClient {
    pub fn new(client: Client, settings: LlmSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.api_base.trim_end_matches('/')
        )
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.settings.model))]
    async fn ask(&self, system: &str, text: &str) -> Result<String, GenerationError> {
        let t0 = Instant::now();
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage::new("system", system), ChatMessage::new("user", text)],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .timeout(self.settings.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                body = %truncate_for_log(&body, 300),
                "LLM endpoint returned an error"
            );
            return Err(GenerationError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = content.chars().count(),
            "LLM call succeeded"
        );
        debug!(response_preview = %truncate_for_log(&content, 300), "LLM response");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout: Duration) -> ChatClient {
        ChatClient::new(
            Client::new(),
            LlmSettings {
                api_base: format!("{}/v1/", server.uri()),
                model: "test-model".to_string(),
                api_key: "sk-test".to_string(),
                temperature: 0.7,
                max_tokens: 2000,
                timeout,
            },
        )
    }

    #[tokio::test]
    async fn test_ask_posts_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "max_tokens": 2000,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "x",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi there"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server, Duration::from_secs(5))
            .ask("be brief", "hello")
            .await
            .unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .ask("s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .ask("s", "u")
            .await
            .unwrap_err();
        match err {
            GenerationError::Server { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_millis(50))
            .ask("s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout));
    }
}
