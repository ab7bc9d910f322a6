use crate::config::Settings;
use crate::llm::error::{LlmDiagnosticsError, STAGE_HTTP, STAGE_PARSE};
use crate::llm::{json, GenerateInput, GeneratedLeads, LlmClient, Provider};
use crate::pricing::TokenUsage;
use crate::prompt;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 1500;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_completion_tokens: u32,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_completion_tokens = std::env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_COMPLETION_TOKENS);

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_completion_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn create_chat_completion(
        &self,
        req: ChatCompletionRequest,
    ) -> anyhow::Result<(serde_json::Value, ChatCompletionResponse)> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer)?);

        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read chat completion response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::OpenAi,
                stage: STAGE_HTTP,
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse chat completion response JSON: {text}"))?;
        let parsed = serde_json::from_value::<ChatCompletionResponse>(raw_json.clone())
            .context("failed to decode chat completion response")?;
        Ok((raw_json, parsed))
    }

    fn request_for(&self, input: &GenerateInput) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: prompt::system_prompt(),
                },
                Message {
                    role: "user",
                    content: prompt::user_prompt(&input.request),
                },
            ],
            max_completion_tokens: self.max_completion_tokens,
        }
    }

    fn response_text(res: &ChatCompletionResponse) -> Option<String> {
        let content = res.choices.first()?.message.content.as_deref()?;
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(content.to_string())
    }

    fn response_usage(res: &ChatCompletionResponse) -> TokenUsage {
        res.usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn generate_leads(&self, input: GenerateInput) -> anyhow::Result<GeneratedLeads> {
        let (raw_json, res) = self
            .create_chat_completion(self.request_for(&input))
            .await?;

        if matches!(
            res.choices.first().and_then(|c| c.finish_reason.as_deref()),
            Some("length")
        ) {
            tracing::warn!(
                max_completion_tokens = self.max_completion_tokens,
                "completion truncated at the token ceiling; output may not parse"
            );
        }

        let usage = Self::response_usage(&res);

        let Some(text) = Self::response_text(&res) else {
            return Err(LlmDiagnosticsError {
                provider: Provider::OpenAi,
                stage: STAGE_PARSE,
                detail: "completion text is empty".to_string(),
                raw_output: None,
                raw_response_json: Some(raw_json),
            }
            .into());
        };

        match json::parse_lead_list(&text) {
            Ok(leads) => Ok(GeneratedLeads {
                leads,
                usage,
                model: self.model.clone(),
            }),
            Err(err) => Err(LlmDiagnosticsError {
                provider: Provider::OpenAi,
                stage: STAGE_PARSE,
                detail: format!("{err:#}"),
                raw_output: Some(text),
                raw_response_json: Some(raw_json),
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_completion_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,

    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canned_response(content: &str, total_tokens: u32) -> ChatCompletionResponse {
        let v = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
            }],
            "usage": {
                "prompt_tokens": total_tokens / 2,
                "completion_tokens": total_tokens - total_tokens / 2,
                "total_tokens": total_tokens,
            },
        });
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn decodes_text_and_usage_from_wire_shape() {
        let res = canned_response("{\"leads\":[]}", 900);
        assert_eq!(
            OpenAiClient::response_text(&res),
            Some("{\"leads\":[]}".to_string())
        );
        assert_eq!(OpenAiClient::response_usage(&res).total_tokens, 900);
    }

    #[test]
    fn missing_usage_decodes_to_zero() {
        let v = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "hi" },
            }],
        });
        let res: ChatCompletionResponse = serde_json::from_value(v).unwrap();
        assert_eq!(OpenAiClient::response_usage(&res), TokenUsage::default());
    }

    #[test]
    fn blank_completion_text_reads_as_absent() {
        let res = canned_response("   ", 10);
        assert_eq!(OpenAiClient::response_text(&res), None);
    }

    #[test]
    fn empty_choices_reads_as_absent() {
        let res: ChatCompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(OpenAiClient::response_text(&res), None);
    }
}
