//! Streaming reverse proxy: terminates OpenAI-compatible chat-completion
//! requests, runs each one through the reasoning pipeline, then forwards
//! the augmented request upstream and relays its stream back to the
//! client.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gateway::config::{GatewayConfig, LogFormat};
use gateway::state::AppState;
use gateway::{routes, version};

#[derive(Parser, Debug)]
#[command(name = "gateway", version)]
struct Cli {
    /// Path to the gateway's YAML configuration file.
    #[arg(short, long, default_value = "gateway.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GatewayConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    let listen_addr = config.listen_addr.clone();
    let state = match AppState::bootstrap(&config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "failed to bootstrap tool fleet");
            return ExitCode::FAILURE;
        }
    };

    let (host, port) = listen_addr
        .rsplit_once(':')
        .map(|(host, port)| (host, port.parse().unwrap_or(0)))
        .unwrap_or((listen_addr.as_str(), 0));
    version::print_banner(host, port, if config.pipeline.rule_based_only { "rule-based" } else { "llm-backed" });

    let router = routes::build_router(Arc::clone(&state));

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %listen_addr, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %listen_addr, "gateway listening");
    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Ok(state) = Arc::try_unwrap(state) {
        state.shutdown().await;
    }

    match serve_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

fn init_tracing(config: &GatewayConfig) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}
