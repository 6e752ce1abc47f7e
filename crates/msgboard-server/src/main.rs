use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use msgboard_server::config::Cli;
use msgboard_service::MessageService;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.profile.store_config();
    let board = MessageService::open(&cli.data_dir, config)
        .with_context(|| format!("open store at {}", cli.data_dir.display()))?;
    let board = Arc::new(board);
    info!(
        data_dir = %cli.data_dir.display(),
        profile = ?cli.profile,
        messages = board.store().len(),
        "store opened"
    );

    let listener = TcpListener::bind(cli.listen)
        .await
        .with_context(|| format!("bind {}", cli.listen))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, msgboard_server::router(Arc::clone(&board)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    match Arc::try_unwrap(board) {
        Ok(board) => {
            board.close().context("close store")?;
            info!("store closed");
        }
        // A blocking task still holds the service; the engine syncs on drop.
        Err(_) => warn!("store still in use at shutdown; skipping explicit close"),
    }

    Ok(())
}
