mod server;
mod services;
mod ws;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parla", about = "Live transcription and language practice server")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overrides [server].host
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides [server].port
    #[arg(short, long)]
    port: Option<u16>,
}

fn load_config(cli: &Cli) -> Result<parla_core::AppConfig> {
    let mut config = match &cli.config {
        Some(path) => parla_core::AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path:?}"))?,
        None => parla_core::AppConfig::default(),
    };
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("parla starting");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let services = Arc::new(services::AppServices::build(config));
    let app = server::router(server::AppState::new(services));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {e}");
            }
            tracing::info!("ctrl-c received, shutting down");
        })
        .await
        .context("server error")?;

    tracing::info!("parla stopped");
    Ok(())
}
