//! Run a prompt or an image through the relay without deploying it.
//!
//! Usage:
//!   cargo run --example invoke -- --prompt "Explain photosynthesis"
//!   cargo run --example invoke -- --image receipt.jpg --max-tokens 500
//!   ANTHROPIC_API_KEY=sk-ant-... cargo run --example invoke -- --provider anthropic --prompt hi
//!
//! AWS credentials come from the usual environment/profile chain.

use std::path::PathBuf;

use base64::Engine as _;
use bedrock_relay::{build_provider, Relay, RelayConfig};
use clap::Parser;
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "invoke", about = "Send one request through bedrock-relay")]
struct Cli {
    /// Text prompt
    #[arg(long, short = 'p')]
    prompt: Option<String>,

    /// Image file to send (declared as JPEG)
    #[arg(long, short = 'i')]
    image: Option<PathBuf>,

    #[arg(long)]
    max_tokens: Option<i64>,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    top_k: Option<i64>,

    #[arg(long)]
    top_p: Option<f64>,

    /// Provider: "bedrock" or "anthropic" (overrides RELAY_PROVIDER)
    #[arg(long)]
    provider: Option<String>,

    /// Model id (overrides RELAY_MODEL_ID)
    #[arg(long)]
    model: Option<String>,

    /// Send the body as a JSON object instead of a JSON string
    #[arg(long)]
    structured: bool,
}

impl Cli {
    fn body(&self) -> Result<Value, String> {
        let mut body = Map::new();
        if let Some(ref prompt) = self.prompt {
            body.insert("prompt".into(), json!(prompt));
        }
        if let Some(ref path) = self.image {
            let bytes =
                std::fs::read(path).map_err(|e| format!("reading {}: {e}", path.display()))?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            body.insert("image".into(), json!(encoded));
        }
        if let Some(v) = self.max_tokens {
            body.insert("max_tokens".into(), json!(v));
        }
        if let Some(v) = self.temperature {
            body.insert("temperature".into(), json!(v));
        }
        if let Some(v) = self.top_k {
            body.insert("top_k".into(), json!(v));
        }
        if let Some(v) = self.top_p {
            body.insert("top_p".into(), json!(v));
        }
        Ok(Value::Object(body))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = RelayConfig::from_lookup(|key| {
        let flag = match key {
            "RELAY_PROVIDER" => cli.provider.clone(),
            "RELAY_MODEL_ID" => cli.model.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })
    .unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    let body = cli.body().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    let provider = build_provider(&config).await.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    eprintln!("provider: {:?}", config.provider);
    eprintln!("model: {}", config.model_id);
    eprintln!("---");

    let event = if cli.structured {
        json!({ "body": body })
    } else {
        json!({ "body": body.to_string() })
    };

    let relay = Relay::with_boxed(provider, config);
    let envelope = relay.handle(event).await;

    eprintln!("status: {}", envelope.status_code);
    println!("{}", envelope.body);

    if envelope.status_code != 200 {
        std::process::exit(1);
    }
}
