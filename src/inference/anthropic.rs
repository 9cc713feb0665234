use async_trait::async_trait;
use serde_json::Value;

use super::{InferenceProvider, InferenceRequest};
use crate::error::InferenceError;

/// Claude API client via Anthropic's messages endpoint. Accepts the same
/// Bedrock-shaped body and rewrites it for the public API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".into(),
        }
    }

    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Bedrock carries the protocol version in the body and the model in the
/// call; the messages API wants the model in the body and the version in a header.
fn to_messages_body(model_id: &str, body: &[u8]) -> Result<Value, InferenceError> {
    let mut parsed: Value =
        serde_json::from_slice(body).map_err(|e| InferenceError::Request(e.to_string()))?;
    let obj = parsed
        .as_object_mut()
        .ok_or_else(|| InferenceError::Request("request body is not a JSON object".into()))?;
    obj.remove("anthropic_version");
    obj.insert("model".into(), Value::String(model_id.to_string()));
    Ok(parsed)
}

#[async_trait]
impl InferenceProvider for AnthropicProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<Value, InferenceError> {
        let body = to_messages_body(&request.model_id, &request.body)?;

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", &request.content_type)
            .header("accept", &request.accept)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::Request(e.to_string()))?;

        if status != 200 {
            return Err(InferenceError::ApiError { status, body: text });
        }

        serde_json::from_str(&text).map_err(|e| InferenceError::Parse(e.to_string()))
    }
}
