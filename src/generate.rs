//! Answer generation via a hosted language model.
//!
//! Defines the [`Generator`] trait and the [`GroqGenerator`]
//! implementation, which calls Groq's OpenAI-compatible chat-completions
//! endpoint. The `GROQ_API_KEY` environment variable must be set; its
//! absence is a fatal startup condition for the retrieval pipeline.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GenerationConfig;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const SYSTEM_PROMPT: &str =
    "You are a support assistant. Answer using only the provided knowledge base passages. \
     If the passages do not contain the answer, say you do not know.";

/// Trait for answer generators.
///
/// The pipeline's generation seam: anything that can turn a grounded
/// prompt into answer text can stand in here.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"llama-3.1-8b-instant"`).
    fn model_name(&self) -> &str;
    /// Produce an answer for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Generator backed by Groq's chat-completions API.
pub struct GroqGenerator {
    model: String,
    api_key: String,
    api_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl GroqGenerator {
    /// Create a generator from configuration.
    ///
    /// # Errors
    ///
    /// Fails if `GROQ_API_KEY` is not set in the environment.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| anyhow::anyhow!("GROQ_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| GROQ_API_URL.to_string()),
            client,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Generator for GroqGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let parsed: ChatCompletionResponse = response
                            .json()
                            .await
                            .context("Could not parse chat-completions response")?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .map(|c| c.message.content)
                            .context("Chat-completions response contained no choices");
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Groq API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Groq API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{
            "choices": [
                { "message": { "role": "assistant", "content": "Refunds take 5 days." } }
            ]
        }"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content,
            "Refunds take 5 days."
        );
    }

    #[test]
    fn test_chat_request_shape() {
        let req = ChatRequest {
            model: "llama-3.1-8b-instant".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
