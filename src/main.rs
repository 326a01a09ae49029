use std::sync::Arc;

use clap::Parser;
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tracing::info;

use prompt_relay::config::{Cli, Config, Secrets};
use prompt_relay::server::api::{build_router, AppState};
use prompt_relay::upstream::openai::OpenAiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.environment.log_filter(cli.verbose).into());

    if cli.environment.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        environment = %cli.environment,
        "prompt-relay v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Secrets first: missing keys are fatal before anything else happens.
    let Secrets {
        openai_api_key,
        signing_key,
    } = Secrets::from_cli(&cli)?;

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen.clone() {
        config.server.listen = listen;
    }

    info!(
        base_url = config.upstream.base_url,
        model = config.upstream.model,
        timeout_secs = config.upstream.timeout_secs,
        token_ttl_minutes = config.auth.token_ttl_minutes,
        "Configuration loaded"
    );

    let client = OpenAiClient::new(&config.upstream, openai_api_key)?;
    let state = Arc::new(AppState::new(
        &config,
        Arc::new(client),
        signing_key.expose_secret().as_bytes(),
    ));

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen;
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
