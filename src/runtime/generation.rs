/// Text-generation backends
///
/// The executor only sees the `TextGenerator` capability. `GenerationClient`
/// implements it over a closed set of backends: model names starting with
/// `claude` go to Anthropic's Messages API, everything else to OpenAI's Chat
/// Completions API. Model names are passed through unchecked; the backend
/// rejects the ones it does not know. Every failure collapses into
/// `PipelineError::Generation`.

use crate::config::GenerationConfig;
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Send a composed prompt to a model and get its raw text back
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> PipelineResult<String>;
}

/// Which backend serves a model name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    Anthropic,
}

impl BackendKind {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            Self::Anthropic
        } else {
            Self::OpenAi
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// A configured backend ready to serve one invocation
#[derive(Debug, Clone, Copy)]
pub enum GenerationBackend<'a> {
    OpenAi(&'a OpenAiBackend),
    Anthropic(&'a AnthropicBackend),
}

impl GenerationBackend<'_> {
    pub async fn invoke(&self, model: &str, prompt: &str) -> PipelineResult<String> {
        match self {
            Self::OpenAi(backend) => backend.invoke(model, prompt).await,
            Self::Anthropic(backend) => backend.invoke(model, prompt).await,
        }
    }
}

/// Backend registry built once from startup configuration
#[derive(Debug, Clone)]
pub struct GenerationClient {
    openai: OpenAiBackend,
    anthropic: Option<AnthropicBackend>,
}

impl GenerationClient {
    pub fn from_config(config: &GenerationConfig) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PipelineError::Generation(format!("failed to build HTTP client: {}", e)))?;

        let openai = OpenAiBackend::new(
            http.clone(),
            &config.openai_api_key,
            &config.openai_base_url,
        );
        let anthropic = config
            .anthropic_api_key
            .as_ref()
            .map(|key| AnthropicBackend::new(http, key, &config.anthropic_base_url));

        Ok(Self { openai, anthropic })
    }

    /// Resolve the backend that serves `model`
    pub fn select(&self, model: &str) -> PipelineResult<GenerationBackend<'_>> {
        match BackendKind::for_model(model) {
            BackendKind::OpenAi => Ok(GenerationBackend::OpenAi(&self.openai)),
            BackendKind::Anthropic => self
                .anthropic
                .as_ref()
                .map(GenerationBackend::Anthropic)
                .ok_or_else(|| {
                    PipelineError::Generation(format!(
                        "model '{}' needs the anthropic backend but ANTHROPIC_API_KEY is not set",
                        model
                    ))
                }),
        }
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, model: &str, prompt: &str) -> PipelineResult<String> {
        let backend = self.select(model)?;
        backend.invoke(model, prompt).await
    }
}

/// OpenAI Chat Completions backend
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    auth_header: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            auth_header: format!("Bearer {}", api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn invoke(&self, model: &str, prompt: &str) -> PipelineResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "messages": [ChatMessage::user(prompt)],
        });

        let request = self
            .http
            .post(&url)
            .header("Authorization", &self.auth_header)
            .json(&body);
        let response: OpenAiResponse = send_json(BackendKind::OpenAi, request).await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| PipelineError::Generation("openai returned no choices".to_string()))
    }
}

/// Anthropic Messages backend
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(http: reqwest::Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn invoke(&self, model: &str, prompt: &str) -> PipelineResult<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = json!({
            "model": model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [ChatMessage::user(prompt)],
        });

        let request = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let response: AnthropicResponse = send_json(BackendKind::Anthropic, request).await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        Ok(text)
    }
}

async fn send_json<T>(kind: BackendKind, request: reqwest::RequestBuilder) -> PipelineResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    let response = request.send().await.map_err(|e| {
        PipelineError::Generation(format!("{} request failed: {}", kind.name(), e))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PipelineError::Generation(format!(
            "{} returned status {}: {}",
            kind.name(),
            status,
            body
        )));
    }

    response.json::<T>().await.map_err(|e| {
        PipelineError::Generation(format!("failed to parse {} response: {}", kind.name(), e))
    })
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> ChatMessage<'a> {
    fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
