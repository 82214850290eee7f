mod config;
mod discord;
mod monitor;
mod probe;
mod publisher;
mod report;
mod status;
mod version;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{error, info, warn};

use crate::{
    config::{open_config, write_default_config},
    discord::WebhookSink,
    monitor::Monitor,
    probe::{SteamProbe, TcpProbe},
    publisher::{MessageIdStore, Publisher},
    version::{long_version, short_version},
};

#[derive(Parser)]
#[command(version = short_version())]
struct Args {
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG も .env から読めるようにロガーより先に読み込む
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // パニックもログに残す
    std::panic::set_hook(Box::new(|panic| {
        error!(panic = %panic, "Unhandled panic");
    }));

    let args = Args::parse();

    if args.init {
        write_default_config(&args.config)?;
        info!(path = ?args.config, "Created default configuration");
        return Ok(());
    }

    info!(version = long_version(), "gamestatus version");

    if let Err(e) = dotenv
        && !e.not_found()
    {
        warn!(error = %e, "Failed to load .env file");
    }

    let config = open_config(&args.config).context("Failed to load configuration")?;
    info!(servers = config.servers.len(), "Configuration loaded");

    let rich = SteamProbe::new(
        &config.steam.endpoint,
        &config.steam.api_key,
        config.status.probe_timeout,
    )?;
    let direct = TcpProbe::new(config.status.probe_timeout);
    let publisher = Publisher::new(
        Box::new(WebhookSink::new(&config.discord)),
        MessageIdStore::new(&config.status.message_id_file),
    );

    let monitor = Arc::new(Monitor::new(
        config.servers,
        config.labels,
        Arc::new(rich),
        Arc::new(direct),
        publisher,
    ));

    monitor.run(config.status.interval, shutdown_signal()).await;

    info!("Shutting down");
    Ok(())
}

/// SIGINT / SIGTERM を待つ。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
