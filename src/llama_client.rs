use anyhow::anyhow;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RelicError, Result};
use crate::settings::Settings;
use crate::summarizer::Annotator;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Local model service configuration.
#[derive(Debug, Clone)]
pub struct LlamaConfig {
    pub api_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl LlamaConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.llama_api_url.trim().is_empty() {
            return Err(RelicError::ConfigurationMissing(
                "LLAMA API URL is not set".to_string(),
            ));
        }
        if settings.llama_model.trim().is_empty() {
            return Err(RelicError::ConfigurationMissing(
                "LLAMA model name is not set".to_string(),
            ));
        }
        Ok(Self {
            api_url: settings.llama_api_url.trim_end_matches('/').to_string(),
            model: settings.llama_model.clone(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

/// Client for the local chat-completion service (non-streaming).
pub struct LlamaClient {
    client: Client,
    config: LlamaConfig,
}

impl LlamaClient {
    pub fn new(config: LlamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RelicError::upstream("create HTTP client", e))?;

        Ok(Self { client, config })
    }

    /// Send a prompt (with optional preceding content) to the model and
    /// return its reply.
    pub async fn chat(&self, prompt: &str, content: Option<&str>) -> Result<String> {
        if prompt.is_empty() {
            return Err(RelicError::Validation("prompt text is required".to_string()));
        }

        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: "You are a helpful AI assistant.".to_string(),
        }];
        if let Some(content) = content {
            messages.push(ChatMessage {
                role: "user".to_string(),
                content: content.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream: false,
        };

        let url = format!("{}/api/chat", self.config.api_url);
        debug!("Sending chat request to {} (model {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RelicError::upstream("model chat request", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RelicError::upstream(
                "model chat request",
                anyhow!("HTTP {}: {}", status, body),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RelicError::upstream("model chat request", e))?;

        let reply = parsed
            .message
            .map(|m| m.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                RelicError::upstream(
                    "model chat request",
                    anyhow!("no reply was returned from the model"),
                )
            })?;

        info!("Model replied with {} characters", reply.len());
        Ok(reply)
    }
}

/// Instruction prompt for the one-line status remark. The model is told
/// not to repeat the title or status and not to decorate the reply.
pub fn remark_prompt(summary: &str, status: &str) -> String {
    format!(
        "Analyze the provided comments of the JIRA issue titled \"{}\". Provide an optimized \
         current task status of the issue in a single line. The status of the JIRA issue is \
         \"{}\". Consider the JIRA title and status for optimal and consistent result, do not \
         include them in the result. Also, do not add any prefix, suffix, suggestions or note.",
        summary, status
    )
}

#[async_trait]
impl Annotator for LlamaClient {
    async fn annotate(&self, summary: &str, status: &str, comments: &str) -> Result<String> {
        // Issues without comments get no AI call at all.
        if comments.is_empty() {
            return Ok(String::new());
        }
        self.chat(&remark_prompt(summary, status), Some(comments)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_requires_endpoint_and_model() {
        let mut settings = Settings {
            llama_api_url: "http://localhost:11434".to_string(),
            llama_model: "llama3".to_string(),
            ..Default::default()
        };
        assert!(LlamaConfig::from_settings(&settings).is_ok());

        settings.llama_model = String::new();
        let error = LlamaConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(error, RelicError::ConfigurationMissing(_)));
        assert!(error.to_string().contains("model"));

        settings.llama_model = "llama3".to_string();
        settings.llama_api_url = "  ".to_string();
        let error = LlamaConfig::from_settings(&settings).unwrap_err();
        assert!(error.to_string().contains("API URL"));
    }

    #[test]
    fn test_remark_prompt_embeds_title_and_status() {
        let prompt = remark_prompt("Fix login redirect", "In Progress");

        assert!(prompt.contains("titled \"Fix login redirect\""));
        assert!(prompt.contains("status of the JIRA issue is \"In Progress\""));
        assert!(prompt.contains("single line"));
        assert!(prompt.contains("do not add any prefix, suffix"));
    }

    #[test]
    fn test_annotate_skips_call_for_empty_comments() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let client = LlamaClient::new(LlamaConfig {
            // Unroutable on purpose; annotate must not touch the network.
            api_url: "http://localhost:1".to_string(),
            model: "llama3".to_string(),
            timeout_seconds: 1,
        })
        .unwrap();

        let remark = runtime
            .block_on(client.annotate("Fix login redirect", "Done", ""))
            .unwrap();
        assert_eq!(remark, "");
    }

    #[test]
    fn test_chat_response_parsing() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": "done"}}"#)
                .unwrap();
        assert_eq!(parsed.message.unwrap().content, "done");

        let empty: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.message.is_none());
    }
}
