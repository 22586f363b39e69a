use crate::workflow::graph::ChatModel;
use crate::workflow::state::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No reply content in model response")]
    EmptyResponse,
}

/// Client for Groq's OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<GroqMessage>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroqMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GroqClient {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            model,
            timeout,
        }
    }

    /// Single request, no retry. Failures go straight back to the caller.
    pub async fn chat_completion(&self, messages: &[Message]) -> Result<ChatCompletionResponse, LlmError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|m| GroqMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
        };

        tracing::debug!("Groq API Request messages count: {}", request.messages.len());

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        tracing::debug!("Groq API Response (status {}): {} bytes", status, response_text.len());

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&response_text)
                .map(|body| body.error.message)
                .unwrap_or(response_text);
            tracing::error!("Groq API error ({}): {}", status, message);
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)?;
        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "Groq token usage"
            );
        }
        Ok(parsed)
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    async fn invoke(&self, messages: &[Message]) -> Result<Message, LlmError> {
        let response = self.chat_completion(messages).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(Message::assistant)
            .ok_or(LlmError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
