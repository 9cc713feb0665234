use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Protocol tag Bedrock expects in every Anthropic messages body.
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Media type declared for every image payload. Non-JPEG uploads are sent
/// under this label anyway; the model usually copes, but not always.
pub const IMAGE_MEDIA_TYPE: &str = "image/jpeg";

/// Instruction paired with an uploaded image.
pub const IMAGE_INSTRUCTION: &str = "Read the text in the image and summarize it.";

pub const DEFAULT_MAX_TOKENS: i64 = 2000;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_TOP_K: i64 = 250;
pub const DEFAULT_TOP_P: f64 = 0.999;

/// Decoded request body. Values keep whatever JSON type the caller sent;
/// unknown keys are ignored and `null` means "use the default".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub prompt: Option<Value>,
    /// Base64 image data, passed through untouched.
    #[serde(default)]
    pub image: Option<Value>,
    #[serde(default)]
    pub max_tokens: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub top_k: Option<Value>,
    #[serde(default)]
    pub top_p: Option<Value>,
}

impl RequestBody {
    /// Generation parameters with defaults applied. Neither types nor ranges
    /// are checked; the model service enforces its own limits.
    pub fn params(&self) -> GenerationParams {
        let or = |value: &Option<Value>, default: Value| value.clone().unwrap_or(default);
        GenerationParams {
            max_tokens: or(&self.max_tokens, DEFAULT_MAX_TOKENS.into()),
            temperature: or(&self.temperature, DEFAULT_TEMPERATURE.into()),
            top_k: or(&self.top_k, DEFAULT_TOP_K.into()),
            top_p: or(&self.top_p, DEFAULT_TOP_P.into()),
        }
    }
}

/// Sampling knobs forwarded to the model and echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: Value,
    pub temperature: Value,
    pub top_k: Value,
    pub top_p: Value,
}

impl Default for GenerationParams {
    fn default() -> Self {
        RequestBody::default().params()
    }
}

/// What the caller asked about. Resolved once; an image always wins over a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Image(String),
    Prompt(String),
}

impl InputKind {
    /// Only non-empty strings count; anything else is treated as absent, so a
    /// malformed prompt never blocks an image. `None` when neither is usable.
    pub fn resolve(prompt: Option<Value>, image: Option<Value>) -> Option<Self> {
        let text = |value: Option<Value>| match value {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };
        if let Some(data) = text(image) {
            return Some(Self::Image(data));
        }
        text(prompt).map(Self::Prompt)
    }

    /// The single user turn sent to the model.
    pub fn into_message(self) -> Message {
        let content = match self {
            Self::Image(data) => vec![
                ContentBlock::Image {
                    source: ImageSource::base64(IMAGE_MEDIA_TYPE, data),
                },
                ContentBlock::Text {
                    text: IMAGE_INSTRUCTION.into(),
                },
            ],
            Self::Prompt(text) => vec![ContentBlock::Text { text }],
        };
        Message {
            role: Role::User,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// A content block in the Anthropic messages schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    pub fn base64(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: "base64".into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

/// Body of a Bedrock `InvokeModel` call for Anthropic models.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub anthropic_version: &'static str,
    #[serde(flatten)]
    pub params: GenerationParams,
    pub stop_sequences: Vec<String>,
}

impl ModelRequest {
    pub fn new(message: Message, params: GenerationParams) -> Self {
        Self {
            messages: vec![message],
            anthropic_version: ANTHROPIC_VERSION,
            params,
            stop_sequences: Vec::new(),
        }
    }
}

/// What the hosting gateway gets back, success or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON document, already serialized.
    pub body: String,
}

impl Envelope {
    pub fn success(params: &GenerationParams, model_response: Value) -> Self {
        let body = json!({
            "message": "Bedrock Model Response",
            "parameters_used": params,
            "model_response": model_response,
        });
        Self {
            status_code: 200,
            body: format!("{body:#}"),
        }
    }

    pub fn error(status_code: u16, error: &str, details: Option<String>) -> Self {
        let mut body = json!({ "error": error });
        if let Some(details) = details {
            body["details"] = Value::String(details);
        }
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    /// Parsed body. Only fails if someone built an envelope by hand.
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}
