use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use livestage_core::{
    bootstrap::{init_services, load_config},
    logging,
};

#[derive(Debug, Parser)]
#[clap(name = "livestage", version, about = "Live stream stage participation server")]
struct Opt {
    /// Path to a YAML/TOML/JSON configuration file
    #[clap(long, short, env = "LIVESTAGE_CONFIG_PATH")]
    config: Option<String>,

    /// Override `server.host`
    #[clap(long)]
    host: Option<String>,

    /// Override `server.http_port`
    #[clap(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    // 1. Load configuration
    let mut config = load_config(opt.config.as_deref())?;
    if let Some(host) = opt.host {
        config.server.host = host;
    }
    if let Some(port) = opt.port {
        config.server.http_port = port;
    }
    if let Err(errors) = config.validate() {
        return Err(anyhow::anyhow!(
            "Invalid command line overrides: {}",
            errors.join("; ")
        ));
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("LiveStage server starting...");

    // 3. Initialize services
    let services = init_services(&config)?;

    // 4. Serve HTTP
    let app = livestage_api::create_router(&services);
    let address = config.http_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {address}"))?;
    info!("HTTP address: {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("LiveStage server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C, shutting down"); }
        () = terminate => { info!("Received SIGTERM, shutting down"); }
    }
}
