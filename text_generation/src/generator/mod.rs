use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies the backing implementation that powers a generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Template,
    ChatCompletion,
}

/// Static metadata describing a particular generator instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorInfo {
    pub provider: ProviderKind,
    pub model_id: String,
    pub max_prompt_chars: usize,
}

/// Errors that can be produced by generator operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("invalid generator configuration: {message}")]
    InvalidConfiguration { message: String },
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("prompt exceeds max length of {max_length} chars, actual length: {actual_length}")]
    PromptTooLong { max_length: usize, actual_length: usize },
    /// Timeout, transport failure or an unusable reply from the provider.
    #[error("text generation unavailable: {message}")]
    ServiceUnavailable { message: String },
}

/// The text-generation collaborator: a synchronous prompt-to-text call.
/// Output is opaque content.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
    fn info(&self) -> &GeneratorInfo;
}

fn validate_prompt(prompt: &str, max_prompt_chars: usize) -> Result<(), GenerationError> {
    if prompt.trim().is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    let actual_length = prompt.chars().count();
    if actual_length > max_prompt_chars {
        return Err(GenerationError::PromptTooLong { max_length: max_prompt_chars, actual_length });
    }
    Ok(())
}

/// Offline generator producing a fixed outfit-script layout from the prompt's
/// comma separated terms. Same prompt, same text.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    info: GeneratorInfo,
}

impl TemplateGenerator {
    pub fn new(model_id: impl Into<String>, max_prompt_chars: usize) -> Result<Self, GenerationError> {
        if max_prompt_chars == 0 {
            return Err(GenerationError::InvalidConfiguration {
                message: "max_prompt_chars must be greater than zero".into(),
            });
        }
        Ok(Self {
            info: GeneratorInfo {
                provider: ProviderKind::Template,
                model_id: model_id.into(),
                max_prompt_chars,
            },
        })
    }
}

impl TextGenerator for TemplateGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        validate_prompt(prompt, self.info.max_prompt_chars)?;
        let terms: Vec<&str> = prompt.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        let mut out = format!("Outfit script ({})\n", terms.join(" / "));
        for (index, term) in terms.iter().enumerate() {
            out.push_str(&format!("{}. Build around a {term} piece.\n", index + 1));
        }
        out.push_str("Finish with accessories that keep the palette consistent.");
        Ok(out)
    }

    fn info(&self) -> &GeneratorInfo {
        &self.info
    }
}

/// Configuration for a chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model_id: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub max_prompt_chars: usize,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug)]
pub struct ChatCompletionGenerator {
    info: GeneratorInfo,
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    system_prompt: String,
    max_tokens: u32,
}

impl ChatCompletionGenerator {
    pub fn new(config: ChatCompletionConfig) -> Result<Self, GenerationError> {
        if config.endpoint.trim().is_empty() {
            return Err(GenerationError::InvalidConfiguration { message: "endpoint must not be empty".into() });
        }
        if config.max_prompt_chars == 0 {
            return Err(GenerationError::InvalidConfiguration {
                message: "max_prompt_chars must be greater than zero".into(),
            });
        }
        if config.timeout.is_zero() {
            return Err(GenerationError::InvalidConfiguration { message: "timeout must be greater than zero".into() });
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GenerationError::InvalidConfiguration { message: format!("build http client: {err}") })?;

        Ok(Self {
            info: GeneratorInfo {
                provider: ProviderKind::ChatCompletion,
                model_id: config.model_id,
                max_prompt_chars: config.max_prompt_chars,
            },
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
            system_prompt: config.system_prompt,
            max_tokens: config.max_tokens,
        })
    }
}

impl TextGenerator for ChatCompletionGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        validate_prompt(prompt, self.info.max_prompt_chars)?;
        let body = ChatRequest {
            model: &self.info.model_id,
            messages: vec![
                ChatMessage { role: "system", content: &self.system_prompt },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: self.max_tokens,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|err| unavailable("request chat completion", err))?;
        let parsed: ChatResponse = response.json().map_err(|err| unavailable("decode chat completion", err))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| GenerationError::ServiceUnavailable { message: "chat completion returned no content".into() })?;
        tracing::debug!(model = %self.info.model_id, chars = content.chars().count(), "generated text");
        Ok(content)
    }

    fn info(&self) -> &GeneratorInfo {
        &self.info
    }
}

fn unavailable(context: &str, err: reqwest::Error) -> GenerationError {
    tracing::warn!(error = %err, "{context} failed");
    GenerationError::ServiceUnavailable { message: format!("{context}: {err}") }
}

/// Serde adapter storing a `Duration` as whole milliseconds.
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
