pub mod anthropic;
pub mod bedrock;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{ProviderKind, RelayConfig};
use crate::error::{ConfigError, InferenceError};

const JSON: &str = "application/json";

/// One `InvokeModel`-style call: a model id and an opaque serialized body.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model_id: String,
    pub content_type: String,
    pub accept: String,
    pub body: Vec<u8>,
}

impl InferenceRequest {
    /// JSON in, JSON out.
    pub fn json(model_id: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            model_id: model_id.into(),
            content_type: JSON.into(),
            accept: JSON.into(),
            body,
        }
    }
}

/// Pure model call. No state, no retries, no timeouts of its own.
/// Returns the decoded response body untouched.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<Value, InferenceError>;
}

/// Build the provider named by the config. Clients are created here, once.
pub async fn build_provider(
    config: &RelayConfig,
) -> Result<Box<dyn InferenceProvider>, ConfigError> {
    match config.provider {
        ProviderKind::Bedrock => Ok(Box::new(BedrockProvider::from_env(&config.region).await)),
        ProviderKind::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or(ConfigError::MissingVar("ANTHROPIC_API_KEY"))?;
            let mut provider = AnthropicProvider::new(api_key);
            if let Some(ref url) = config.anthropic_base_url {
                provider = provider.with_base_url(url);
            }
            Ok(Box::new(provider))
        }
    }
}

pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
