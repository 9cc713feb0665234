use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Cross-region inference profile for Claude 3.5 Sonnet v2.
pub const DEFAULT_BEDROCK_MODEL: &str = "us.anthropic.claude-3-5-sonnet-20241022-v2:0";
/// Same model under its public API name.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
/// The `us.` profile above only resolves from a US region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Which backend serves the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Bedrock,
    Anthropic,
}

impl ProviderKind {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Bedrock => DEFAULT_BEDROCK_MODEL,
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bedrock" => Ok(Self::Bedrock),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Relay configuration.
#[derive(Clone)]
pub struct RelayConfig {
    pub model_id: String,
    pub region: String,
    pub provider: ProviderKind,
    /// Elide images and scrub credentials from the logged event.
    pub redact_logs: bool,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_BEDROCK_MODEL.into(),
            region: DEFAULT_REGION.into(),
            provider: ProviderKind::Bedrock,
            redact_logs: true,
            anthropic_api_key: None,
            anthropic_base_url: None,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("model_id", &self.model_id)
            .field("region", &self.region)
            .field("provider", &self.provider)
            .field("redact_logs", &self.redact_logs)
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("anthropic_base_url", &self.anthropic_base_url)
            .finish()
    }
}

impl RelayConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`. Blank values are treated as unset.
    ///
    /// - `RELAY_PROVIDER`: `bedrock` (default) or `anthropic`
    /// - `RELAY_MODEL_ID`: model id; default depends on the provider
    /// - `RELAY_REGION`: Bedrock region, default `us-east-1`
    /// - `RELAY_REDACT_LOGS`: `false`/`0`/`no`/`off` logs events verbatim
    /// - `ANTHROPIC_API_KEY`, `ANTHROPIC_BASE_URL`: anthropic provider only
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("RELAY_PROVIDER") {
            Some(name) => name.parse()?,
            None => ProviderKind::default(),
        };

        let redact_logs = get("RELAY_REDACT_LOGS")
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "false" | "0" | "no" | "off"
                )
            })
            .unwrap_or(true);

        Ok(Self {
            model_id: get("RELAY_MODEL_ID").unwrap_or_else(|| provider.default_model().into()),
            region: get("RELAY_REGION").unwrap_or_else(|| DEFAULT_REGION.into()),
            provider,
            redact_logs,
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            anthropic_base_url: get("ANTHROPIC_BASE_URL"),
        })
    }
}
