use crate::config::{LlmConfig, Provider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not configured: set {env_var} in the environment or in .env.local")]
    MissingApiKey { env_var: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No response generated from AI")]
    EmptyResponse,

    #[error("LLM request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl LlmError {
    fn transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else {
            LlmError::Http(err)
        }
    }
}

/// Anything that can turn a prompt into the model's markdown answer.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

pub struct LlmClient {
    client: Client,
    settings: LlmConfig,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(settings: LlmConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .with_context(|| format!("Failed to build HTTP client for {}", settings.api_base))?;

        Ok(Self {
            client,
            settings,
            api_key,
        })
    }

    /// Builds a client whose key comes from the variable named in `settings`.
    pub fn from_config(settings: &LlmConfig) -> Result<Self> {
        let api_key = settings.api_key();
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; generation requests will be rejected",
                settings.api_key_env
            );
        }
        Self::new(settings.clone(), api_key)
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| LlmError::MissingApiKey {
                env_var: self.settings.api_key_env.clone(),
            })
    }

    fn base(&self) -> &str {
        self.settings.api_base.trim_end_matches('/')
    }

    async fn generate_gemini(&self, api_key: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base(), self.settings.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        tracing::debug!("Calling Gemini API: {} with model: {}", url, self.settings.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::transport)?;

        let value = read_success_body(response).await?;
        gemini_text(&value).ok_or_else(|| missing_text(&value))
    }

    async fn generate_chat(&self, api_key: &str, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base());
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_output_tokens,
            stream: false,
        };

        tracing::debug!("Calling LLM API: {} with model: {}", url, self.settings.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::transport)?;

        let value = read_success_body(response).await?;
        chat_text(&value).ok_or_else(|| missing_text(&value))
    }
}

#[async_trait]
impl PlanGenerator for LlmClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.api_key()?;
        match self.settings.provider {
            Provider::Gemini => self.generate_gemini(api_key, prompt).await,
            Provider::OpenAi => self.generate_chat(api_key, prompt).await,
        }
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<Value, LlmError> {
    let status = response.status();
    tracing::info!(status = status.as_u16(), "LLM API responded");

    let text = response.text().await.map_err(LlmError::transport)?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| provider_error_message(&v))
            .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| "Unknown error".to_string());
        tracing::error!(status = status.as_u16(), message = %message, "LLM API error");
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&text)?)
}

// A 2xx body without text is either an embedded provider error or an empty answer.
fn missing_text(value: &Value) -> LlmError {
    match provider_error_message(value) {
        Some(message) => LlmError::Api {
            status: 502,
            message,
        },
        None => {
            tracing::warn!("LLM response carried no text: {}", value);
            LlmError::EmptyResponse
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.trim().is_empty()).then_some(s)
}

fn join_text_parts(parts: &[Value]) -> Option<String> {
    let joined: String = parts
        .iter()
        .filter_map(|p| p.as_str().or_else(|| p.get("text").and_then(Value::as_str)))
        .collect();
    non_empty(joined)
}

/// `candidates[0].content.parts[*].text`, concatenated.
fn gemini_text(value: &Value) -> Option<String> {
    value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| join_text_parts(parts))
}

fn chat_text(value: &Value) -> Option<String> {
    let choice = value.get("choices").and_then(|c| c.get(0))?;

    match choice.get("message").and_then(|m| m.get("content")) {
        Some(Value::String(s)) => return non_empty(s.clone()),
        Some(Value::Array(parts)) => return join_text_parts(parts),
        _ => {}
    }

    choice
        .get("text")
        .and_then(Value::as_str)
        .and_then(|s| non_empty(s.to_string()))
}

fn provider_error_message(value: &Value) -> Option<String> {
    const MESSAGE_KEYS: [&str; 4] = ["message", "msg", "detail", "error_message"];

    let from_keys = |obj: &Value| {
        MESSAGE_KEYS
            .iter()
            .filter_map(|key| obj.get(*key))
            .filter_map(Value::as_str)
            .find_map(|s| non_empty(s.to_string()))
    };

    match value.get("error") {
        Some(Value::String(s)) => non_empty(s.clone()),
        Some(err @ Value::Object(_)) => from_keys(err).or_else(|| Some(err.to_string())),
        _ => {
            let success = value.get("success").and_then(Value::as_bool);
            if success == Some(false) {
                from_keys(value).or_else(|| Some("success flag was false".to_string()))
            } else {
                None
            }
        }
    }
}
