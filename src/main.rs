//! Lambda entry point. Reads config from the environment, builds the
//! provider once per execution environment, then serves events.

use bedrock_relay::{build_provider, Envelope, Relay, RelayConfig};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = RelayConfig::from_env()?;
    info!(
        provider = ?config.provider,
        model = %config.model_id,
        region = %config.region,
        redact_logs = config.redact_logs,
        "starting relay"
    );

    let provider = build_provider(&config).await?;
    let relay = Relay::with_boxed(provider, config);
    let relay = &relay;

    // The Lambda context is not consulted.
    run(service_fn(move |event: LambdaEvent<Value>| async move {
        Ok::<Envelope, Error>(relay.handle(event.payload).await)
    }))
    .await
}
