//! The repair oracle: an opaque prompt-in, candidate-out capability.
//!
//! The production implementation talks to OpenRouter's chat-completions
//! endpoint. The trait exists so the repair loop can be exercised with a
//! scripted oracle in tests.

use crate::config::Config;
use crate::util::truncate;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// OpenRouter direct API URL (BYOK mode)
const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Model used when the config does not name one.
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Completion cap for repair responses; fixes are whole-snippet rewrites,
/// not long documents.
const MAX_COMPLETION_TOKENS: u32 = 1500;

/// Capability consumed by the repair loop: prompt in, candidate code out.
pub trait RepairOracle {
    fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

/// OpenRouter-backed oracle.
pub struct OpenRouterOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenRouterOracle {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    /// Build an oracle from persisted configuration. Fails when no API key
    /// is available anywhere.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.get_api_key().ok_or_else(|| {
            anyhow::anyhow!(
                "No API key configured. Set OPENROUTER_API_KEY or add it to the config file."
            )
        })?;
        Ok(Self::new(api_key, config.model.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl RepairOracle for OpenRouterOracle {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens: MAX_COMPLETION_TOKENS,
            stream: false,
        };

        let response = self
            .client
            .post(OPENROUTER_URL)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let error_msg = match status.as_u16() {
                401 => "Invalid API key.".to_string(),
                429 => "Rate limited by OpenRouter. Try again in a few minutes.".to_string(),
                500..=599 => format!(
                    "OpenRouter server error ({}). The service may be temporarily unavailable.",
                    status
                ),
                _ => format!("API error {}: {}", status, truncate(&text, 200)),
            };
            return Err(anyhow::anyhow!("{}", error_msg));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow::anyhow!("Failed to parse OpenRouter response: {}\n{}", e, truncate(&text, 200))
        })?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        Ok(content)
    }
}
