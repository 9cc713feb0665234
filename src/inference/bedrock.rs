use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde_json::Value;
use tracing::{debug, error};

use super::{InferenceProvider, InferenceRequest};
use crate::error::InferenceError;

/// Amazon Bedrock `InvokeModel`. Credentials come from the default AWS chain.
pub struct BedrockProvider {
    client: Client,
}

impl BedrockProvider {
    /// Load shared AWS config for `region` and build the runtime client.
    pub async fn from_env(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InferenceProvider for BedrockProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<Value, InferenceError> {
        let model_id = request.model_id;
        let output = self
            .client
            .invoke_model()
            .model_id(&model_id)
            .content_type(request.content_type)
            .accept(request.accept)
            .body(Blob::new(request.body))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(model = %model_id, error = %message, "bedrock invoke_model failed");
                InferenceError::Request(message)
            })?;

        let bytes = output.body().as_ref();
        debug!(model = %model_id, bytes = bytes.len(), "bedrock response received");

        serde_json::from_slice(bytes).map_err(|e| InferenceError::Parse(e.to_string()))
    }
}
