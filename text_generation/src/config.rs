use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::generator::{
    ChatCompletionConfig, ChatCompletionGenerator, GenerationError, TemplateGenerator, TextGenerator,
};

/// Default settings for the text generators.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorDefaults {
    pub chat_endpoint: &'static str,
    pub chat_model_id: &'static str,
    pub api_key_env: &'static str,
    pub system_prompt: &'static str,
    pub max_tokens: u32,
    pub max_prompt_chars: usize,
    pub timeout_ms: u64,
    pub template_model_id: &'static str,
}

/// Shared defaults so CLI, service and tests stay in sync.
pub const GENERATOR_DEFAULTS: GeneratorDefaults = GeneratorDefaults {
    chat_endpoint: "https://api.openai.com/v1/chat/completions",
    chat_model_id: "gpt-3.5-turbo",
    api_key_env: "OPENAI_API_KEY",
    system_prompt: "You are a fashion stylist. Write a short outfit script that combines the given keywords.",
    max_tokens: 512,
    max_prompt_chars: 2000,
    timeout_ms: 30_000,
    template_model_id: "outfit-template-v1",
};

/// Which generator to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum GeneratorConfig {
    Template { model_id: String, max_prompt_chars: usize },
    ChatCompletion(ChatCompletionConfig),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        default_template_config()
    }
}

pub fn default_template_config() -> GeneratorConfig {
    GeneratorConfig::Template {
        model_id: GENERATOR_DEFAULTS.template_model_id.into(),
        max_prompt_chars: GENERATOR_DEFAULTS.max_prompt_chars,
    }
}

/// Chat-completion settings from the shared defaults. The API key is read from
/// the environment variable named in [`GENERATOR_DEFAULTS`].
pub fn default_chat_config() -> ChatCompletionConfig {
    ChatCompletionConfig {
        endpoint: GENERATOR_DEFAULTS.chat_endpoint.into(),
        api_key: std::env::var(GENERATOR_DEFAULTS.api_key_env).ok().filter(|k| !k.trim().is_empty()),
        model_id: GENERATOR_DEFAULTS.chat_model_id.into(),
        system_prompt: GENERATOR_DEFAULTS.system_prompt.into(),
        max_tokens: GENERATOR_DEFAULTS.max_tokens,
        max_prompt_chars: GENERATOR_DEFAULTS.max_prompt_chars,
        timeout: Duration::from_millis(GENERATOR_DEFAULTS.timeout_ms),
    }
}

pub fn build_generator(config: &GeneratorConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    match config {
        GeneratorConfig::Template { model_id, max_prompt_chars } => {
            Ok(Arc::new(TemplateGenerator::new(model_id.clone(), *max_prompt_chars)?))
        }
        GeneratorConfig::ChatCompletion(chat) => Ok(Arc::new(ChatCompletionGenerator::new(chat.clone())?)),
    }
}
