//! LLM-gateway client speaking the OpenAI chat-completions dialect.

use async_trait::async_trait;
use gamemaster_core::error::{GmError, ServiceKind};
use gamemaster_core::ports::{ChatMessage, ChatRequest, LlmService};
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::http::ServiceHttp;

const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

/// `LlmService` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpLlmService {
    http: ServiceHttp,
    model: String,
}

impl HttpLlmService {
    /// Creates a client for `config.llm_gateway_url` using `config.llm_model`.
    ///
    /// # Errors
    ///
    /// Returns `GmError::Infrastructure` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, GmError> {
        Ok(Self {
            http: ServiceHttp::new(
                ServiceKind::Llm,
                &config.llm_gateway_url,
                config.llm_timeout,
                config.health_timeout,
                config.retry,
            )?,
            model: config.llm_model.clone(),
        })
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionResponse {
    /// Text of the first choice; empty when there is none.
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| {
                tracing::trace!(finish_reason = ?choice.finish_reason, "completion received");
                choice.message.content
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmService for HttpLlmService {
    async fn chat(&self, request: &ChatRequest) -> Result<String, GmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let response: CompletionResponse = self.http.post_json(COMPLETIONS_PATH, &body).await?;
        Ok(response.into_text())
    }

    async fn check_health(&self) -> Result<bool, GmError> {
        self.http.check_health().await
    }
}
