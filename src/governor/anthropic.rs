// src/governor/anthropic.rs
// Opaque model capability and its Anthropic implementation. The governor
// only ever talks to the trait; tests substitute a counting mock.

use std::{env, time::Duration, time::Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use super::types::{ModelMessage, ModelResponse};

/// The opaque `call_model` capability from the governor's point of view.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn call_model(
        &self,
        model: &str,
        messages: &[ModelMessage],
        max_tokens: u32,
    ) -> Result<ModelResponse>;

    fn provider(&self) -> &str;
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ModelMessage],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: i64,
    output_tokens: i64,
}

impl AnthropicClient {
    pub fn new() -> Self {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .expect("ANTHROPIC_API_KEY must be set");

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
        }
    }

    /// Clamp max_tokens to the model's known output cap.
    /// Defaults conservatively if unknown.
    fn clamp_max_tokens(model: &str, requested: u32) -> u32 {
        let m = model.to_ascii_lowercase();

        let cap = if m.contains("sonnet") {
            64_000
        } else if m.contains("opus") {
            32_000
        } else {
            8_192
        };

        requested.min(cap).max(1)
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn call_model(
        &self,
        model: &str,
        messages: &[ModelMessage],
        max_tokens: u32,
    ) -> Result<ModelResponse> {
        let request = MessagesRequest {
            model,
            max_tokens: Self::clamp_max_tokens(model, max_tokens),
            messages,
        };

        let mut attempt = 0;
        let max_attempts = 3;
        let started = Instant::now();

        loop {
            let response = self
                .client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&request)
                .send()
                .await?;

            match response.status().as_u16() {
                200 => {
                    let parsed: MessagesResponse = response.json().await?;
                    let text = parsed
                        .content
                        .iter()
                        .map(|b| b.text.as_str())
                        .collect::<Vec<_>>()
                        .join("");
                    return Ok(ModelResponse {
                        text,
                        provider: self.provider().to_string(),
                        model: parsed.model,
                        input_tokens: parsed.usage.input_tokens,
                        output_tokens: parsed.usage.output_tokens,
                        latency_ms: started.elapsed().as_millis() as i64,
                    });
                }
                429 => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(anyhow::anyhow!(
                            "Rate limited after {} attempts",
                            max_attempts
                        ));
                    }
                    let wait_time = Duration::from_secs(2u64.pow(attempt));
                    warn!("Rate limited, waiting {:?} before retry", wait_time);
                    sleep(wait_time).await;
                }
                code => {
                    let error_body = response.text().await?;
                    return Err(anyhow::anyhow!("API error {}: {}", code, error_body));
                }
            }
        }
    }

    fn provider(&self) -> &str {
        "anthropic"
    }
}
