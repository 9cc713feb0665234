use crate::types::Envelope;

/// Everything that can stop a request short of a model response.
/// Each variant knows which status code it maps to.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing request body.")]
    MissingBody,
    #[error("Invalid JSON format.")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Request body must be a JSON object.")]
    NotAnObject,
    #[error("Either 'prompt' or 'image' must be provided.")]
    MissingInput,
    #[error("Model invocation failed")]
    Inference(#[from] InferenceError),
    #[error("Unexpected error")]
    Unexpected(String),
}

impl RelayError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingBody
            | Self::InvalidJson(_)
            | Self::NotAnObject
            | Self::MissingInput => 400,
            Self::Inference(_) | Self::Unexpected(_) => 500,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Inference(e) => Some(e.to_string()),
            Self::Unexpected(details) => Some(details.clone()),
            _ => None,
        }
    }

    /// Text of the underlying cause, for logs.
    pub(crate) fn source_text(&self) -> Option<String> {
        std::error::Error::source(self).map(|s| s.to_string())
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope::error(self.status_code(), &self.to_string(), self.details())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown provider '{0}', expected 'bedrock' or 'anthropic'")]
    UnknownProvider(String),
    #[error("{0} must be set")]
    MissingVar(&'static str),
}
