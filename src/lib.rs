pub mod config;
pub mod error;
pub mod inference;
pub mod redaction;
pub mod request;
pub mod types;

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;
use tracing::{error, info, warn};

pub use config::{ProviderKind, RelayConfig};
pub use error::{ConfigError, InferenceError, RelayError};
pub use inference::{
    build_provider, AnthropicProvider, BedrockProvider, InferenceProvider, InferenceRequest,
};
pub use redaction::LogRedactor;
pub use types::{
    ContentBlock, Envelope, GenerationParams, ImageSource, InputKind, Message, ModelRequest,
    RequestBody, Role,
};

/// The request handler. Turns one gateway event into one model call and
/// always answers with an [`Envelope`].
pub struct Relay {
    provider: Box<dyn InferenceProvider>,
    config: RelayConfig,
    redactor: Option<LogRedactor>,
}

impl Relay {
    pub fn new(provider: impl InferenceProvider + 'static, config: RelayConfig) -> Self {
        Self::with_boxed(Box::new(provider), config)
    }

    /// For a provider already chosen at runtime, e.g. by [`build_provider`].
    pub fn with_boxed(provider: Box<dyn InferenceProvider>, config: RelayConfig) -> Self {
        let redactor = config.redact_logs.then(LogRedactor::new);
        Self {
            provider,
            config,
            redactor,
        }
    }

    /// Handle one event. Never fails and never panics past this point.
    pub async fn handle(&self, event: Value) -> Envelope {
        match AssertUnwindSafe(self.process(&event)).catch_unwind().await {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => {
                if e.status_code() >= 500 {
                    error!(error = %e, details = ?e.source_text(), "request failed");
                } else {
                    warn!(error = %e, "rejected request");
                }
                e.into_envelope()
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "handler panicked");
                RelayError::Unexpected(message).into_envelope()
            }
        }
    }

    async fn process(&self, event: &Value) -> Result<Envelope, RelayError> {
        self.log_event(event);

        let body = request::decode_body(event)?;
        let params = body.params();
        let input =
            InputKind::resolve(body.prompt, body.image).ok_or(RelayError::MissingInput)?;

        let model_request = ModelRequest::new(input.into_message(), params.clone());
        let payload = serde_json::to_vec(&model_request)
            .map_err(|e| RelayError::Unexpected(e.to_string()))?;

        info!(
            model = %self.config.model_id,
            bytes = payload.len(),
            "invoking model"
        );
        let response = self
            .provider
            .infer(InferenceRequest::json(&self.config.model_id, payload))
            .await?;

        Ok(Envelope::success(&params, response))
    }

    fn log_event(&self, event: &Value) {
        match self.redactor {
            Some(ref redactor) => {
                let (rendered, found) = redactor.render_event(event);
                if !found.is_empty() {
                    info!(redacted_count = found.len(), types = ?found, "redacted secrets from event");
                }
                info!(event = %rendered, "received event");
            }
            None => info!(event = %event, "received event"),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    // --- Mock Provider ---

    struct MockProvider {
        responses: Mutex<VecDeque<Result<Value, InferenceError>>>,
        requests: std::sync::Arc<Mutex<Vec<InferenceRequest>>>,
    }

    impl MockProvider {
        fn new(responses: Vec<Result<Value, InferenceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Default::default(),
            }
        }

        fn ok(response: Value) -> Self {
            Self::new(vec![Ok(response)])
        }
    }

    #[async_trait]
    impl InferenceProvider for MockProvider {
        async fn infer(&self, request: InferenceRequest) -> Result<Value, InferenceError> {
            self.requests.lock().await.push(request);
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Err(InferenceError::Request("no more mock responses".into())))
        }
    }

    // --- Deterministic Provider ---

    struct FixedProvider(Value);

    #[async_trait]
    impl InferenceProvider for FixedProvider {
        async fn infer(&self, _request: InferenceRequest) -> Result<Value, InferenceError> {
            Ok(self.0.clone())
        }
    }

    // --- Panicking Provider ---

    struct PanicProvider;

    #[async_trait]
    impl InferenceProvider for PanicProvider {
        async fn infer(&self, _request: InferenceRequest) -> Result<Value, InferenceError> {
            panic!("provider blew up")
        }
    }

    // --- Helpers ---

    fn claude_reply() -> Value {
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": "Hello there." }],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 12, "output_tokens": 4 }
        })
    }

    /// Relay plus a handle on the requests its provider saw.
    fn relay_with(provider: MockProvider) -> (Relay, std::sync::Arc<Mutex<Vec<InferenceRequest>>>) {
        let requests = provider.requests.clone();
        (Relay::new(provider, RelayConfig::default()), requests)
    }

    fn sent_body(request: &InferenceRequest) -> Value {
        serde_json::from_slice(&request.body).unwrap()
    }

    fn string_event(body: Value) -> Value {
        json!({ "body": body.to_string() })
    }

    // --- Client errors ---

    #[tokio::test]
    async fn missing_body_is_rejected() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay.handle(json!({ "headers": {} })).await;
        assert_eq!(env.status_code, 400);
        let body = env.json().unwrap();
        assert!(body["error"].as_str().unwrap().contains("Missing request body"));
        assert!(requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (relay, _) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay.handle(json!({ "body": "{\"prompt\": \"unterminated" })).await;
        assert_eq!(env.status_code, 400);
        assert_eq!(env.json().unwrap(), json!({ "error": "Invalid JSON format." }));
    }

    #[tokio::test]
    async fn neither_prompt_nor_image_is_rejected() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay.handle(string_event(json!({ "max_tokens": 10 }))).await;
        assert_eq!(env.status_code, 400);
        let error = env.json().unwrap()["error"].as_str().unwrap().to_string();
        assert!(error.contains("'prompt'") && error.contains("'image'"), "got: {error}");
        assert!(requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn non_string_prompt_alone_is_rejected() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay.handle(json!({ "body": { "prompt": { "x": 1 } } })).await;
        assert_eq!(env.status_code, 400);
        assert_eq!(
            env.json().unwrap()["error"],
            "Either 'prompt' or 'image' must be provided."
        );
        assert!(requests.lock().await.is_empty());
    }

    // --- Message construction ---

    #[tokio::test]
    async fn prompt_only_sends_single_text_turn() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay.handle(string_event(json!({ "prompt": "Why is the sky blue?" }))).await;
        assert_eq!(env.status_code, 200);

        let requests = requests.lock().await;
        assert_eq!(requests.len(), 1);
        let sent = sent_body(&requests[0]);
        assert_eq!(
            sent["messages"],
            json!([{
                "role": "user",
                "content": [{ "type": "text", "text": "Why is the sky blue?" }]
            }])
        );
    }

    #[tokio::test]
    async fn image_takes_precedence_over_prompt() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay
            .handle(json!({ "body": { "prompt": "ignored", "image": "iVBORw0KGgo=" } }))
            .await;
        assert_eq!(env.status_code, 200);

        let requests = requests.lock().await;
        let sent = sent_body(&requests[0]);
        let messages = sent["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        let content = messages[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["data"], "iVBORw0KGgo=");
        assert_eq!(content[0]["source"]["media_type"], "image/jpeg");
        assert_eq!(content[1]["text"], types::IMAGE_INSTRUCTION);
        assert!(!sent.to_string().contains("ignored"));
    }

    #[tokio::test]
    async fn image_is_sent_despite_ill_typed_prompt() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay
            .handle(json!({ "body": { "image": "AAAA", "prompt": { "x": 1 } } }))
            .await;
        assert_eq!(env.status_code, 200);

        let requests = requests.lock().await;
        let sent = sent_body(&requests[0]);
        assert_eq!(sent["messages"][0]["content"][0]["source"]["data"], "AAAA");
    }

    #[tokio::test]
    async fn parameters_are_forwarded_and_echoed_unchanged() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay
            .handle(string_event(json!({
                "prompt": "hi",
                "max_tokens": 100.0,
                "temperature": "0.5",
                "top_k": -3,
            })))
            .await;
        assert_eq!(env.status_code, 200);

        let requests = requests.lock().await;
        let sent = sent_body(&requests[0]);
        assert_eq!(sent["max_tokens"], json!(100.0));
        assert_eq!(sent["temperature"], json!("0.5"));
        assert_eq!(sent["top_k"], json!(-3));
        assert_eq!(sent["top_p"], json!(0.999));

        assert_eq!(
            env.json().unwrap()["parameters_used"],
            json!({ "max_tokens": 100.0, "temperature": "0.5", "top_k": -3, "top_p": 0.999 })
        );
    }

    #[tokio::test]
    async fn request_carries_model_and_protocol_fields() {
        let (relay, requests) = relay_with(MockProvider::ok(claude_reply()));
        relay
            .handle(string_event(json!({ "prompt": "hi", "top_k": 5, "top_p": 0.5 })))
            .await;

        let requests = requests.lock().await;
        let request = &requests[0];
        assert_eq!(request.model_id, config::DEFAULT_BEDROCK_MODEL);
        assert_eq!(request.content_type, "application/json");
        assert_eq!(request.accept, "application/json");

        let sent = sent_body(request);
        assert_eq!(sent["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(sent["max_tokens"], 2000);
        assert_eq!(sent["temperature"], 1.0);
        assert_eq!(sent["top_k"], 5);
        assert_eq!(sent["top_p"], 0.5);
        assert_eq!(sent["stop_sequences"], json!([]));
    }

    // --- Downstream ---

    #[tokio::test]
    async fn provider_failure_is_a_500() {
        let provider = MockProvider::new(vec![Err(InferenceError::Request(
            "ThrottlingException: slow down".into(),
        ))]);
        let (relay, _) = relay_with(provider);
        let env = relay.handle(string_event(json!({ "prompt": "hi" }))).await;
        assert_eq!(env.status_code, 500);
        let body = env.json().unwrap();
        assert_eq!(body["error"], "Model invocation failed");
        assert!(body["details"].as_str().unwrap().contains("ThrottlingException"));
    }

    #[tokio::test]
    async fn undecodable_response_is_a_500() {
        let provider = MockProvider::new(vec![Err(InferenceError::Parse(
            "expected value at line 1 column 1".into(),
        ))]);
        let (relay, _) = relay_with(provider);
        let env = relay.handle(string_event(json!({ "prompt": "hi" }))).await;
        assert_eq!(env.status_code, 500);
        assert_eq!(env.json().unwrap()["error"], "Model invocation failed");
    }

    #[tokio::test]
    async fn success_echoes_params_and_response() {
        let (relay, _) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay
            .handle(string_event(json!({ "prompt": "hi", "max_tokens": 64, "temperature": 0.3 })))
            .await;
        assert_eq!(env.status_code, 200);

        let body = env.json().unwrap();
        assert_eq!(body["message"], "Bedrock Model Response");
        assert_eq!(
            body["parameters_used"],
            json!({ "max_tokens": 64, "temperature": 0.3, "top_k": 250, "top_p": 0.999 })
        );
        assert_eq!(body["model_response"], claude_reply());
    }

    #[tokio::test]
    async fn panicking_provider_is_caught() {
        let relay = Relay::new(PanicProvider, RelayConfig::default());
        let env = relay.handle(string_event(json!({ "prompt": "hi" }))).await;
        assert_eq!(env.status_code, 500);
        let body = env.json().unwrap();
        assert_eq!(body["error"], "Unexpected error");
        assert_eq!(body["details"], "provider blew up");
    }

    #[tokio::test]
    async fn identical_input_gives_identical_envelopes() {
        let relay = Relay::new(FixedProvider(claude_reply()), RelayConfig::default());
        let event = string_event(json!({ "prompt": "same", "top_p": 0.9 }));
        let first = relay.handle(event.clone()).await;
        let second = relay.handle(event).await;
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn envelope_serializes_with_status_code_key() {
        let (relay, _) = relay_with(MockProvider::ok(claude_reply()));
        let env = relay.handle(json!({})).await;
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire["statusCode"], 400);
        assert!(wire["body"].is_string());
    }

    #[tokio::test]
    async fn works_with_logging_verbatim() {
        let config = RelayConfig {
            redact_logs: false,
            ..RelayConfig::default()
        };
        let relay = Relay::with_boxed(Box::new(FixedProvider(claude_reply())), config);
        let env = relay.handle(json!({ "body": { "image": "AAAA" } })).await;
        assert_eq!(env.status_code, 200);
    }
}
