//! HTTP chat-completion adapter for OpenAI-compatible services.

use async_trait::async_trait;
use ragpipe_core::{GenerationParams, Generator, ModelError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl ChatGenerator {
    /// Adapter for the service under `base_url`, e.g.
    /// `https://api.openai.com/v1`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system: &str,
        user: &str,
        params: GenerationParams,
    ) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system,
                    },
                    ChatMessage {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: params.temperature,
                max_tokens: params.max_tokens,
            })
            .send()
            .await
            .map_err(|e| ModelError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ModelError::Api { status, message });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Response(e.to_string()))?;
        completion_text(body)
    }
}

fn completion_text(body: ChatResponse) -> Result<String, ModelError> {
    body.choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ModelError::Response("no choices in completion response".to_string()))
}
