//! Faucet service binary

use clap::Parser;
use obx_faucet::api::{fund_handler, health_handler, root_handler};
use obx_faucet::{Faucet, FaucetConfig, HttpNodeClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to serve the faucet endpoint on
    #[arg(long)]
    server_addr: Option<String>,

    /// RPC URL of the chain node
    #[arg(long)]
    node_url: Option<String>,

    /// Chain identifier
    #[arg(long)]
    chain_id: Option<u64>,

    /// Prefunded account private key used to fund other accounts
    #[arg(long)]
    private_key: Option<String>,

    /// Amount to transfer per request (in wei)
    #[arg(long)]
    fund_amount: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = if args.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = FaucetConfig::from_env();

    if let Some(addr) = args.server_addr {
        config.server_addr = addr;
    }

    if let Some(node_url) = args.node_url {
        config.node_url = node_url;
    }

    if let Some(chain_id) = args.chain_id {
        config.chain_id = chain_id;
    }

    if let Some(key) = args.private_key {
        config.private_key = key;
    }

    if let Some(amount) = args.fund_amount {
        config.fund_amount_wei = amount;
    }

    if config.private_key.is_empty() {
        anyhow::bail!("no faucet private key configured (--private-key or FAUCET_PRIVATE_KEY)");
    }

    info!("Starting OBX faucet service v{}", env!("CARGO_PKG_VERSION"));
    info!("  Server address: {}", config.server_addr);
    info!("  Node URL: {}", config.node_url);
    info!("  Chain id: {}", config.chain_id);
    info!("  Fund amount: {} wei", config.fund_amount_wei);
    info!(
        "  Confirmation window: {}s, poll interval {}ms",
        config.confirmation_timeout_secs, config.poll_interval_millis
    );

    let node = Arc::new(HttpNodeClient::new(config.node_url.clone()));
    let faucet = Arc::new(Faucet::new(&config, node).await?);
    info!(address = %faucet.address(), "faucet service initialized");

    let mut app = axum::Router::new()
        .route("/", axum::routing::get(root_handler))
        .route("/health", axum::routing::get(health_handler))
        .route("/fund", axum::routing::post(fund_handler))
        .with_state(faucet);

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let addr: SocketAddr = config.server_addr.parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
