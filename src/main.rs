use crate::controller::build_router;
use crate::model::app_state::AppState;
use crate::shared::download_queue::DownloadQueue;
use crate::shared::extractor::YtDlpExtractor;
use crate::shared::file_store::FileStore;
use std::sync::Arc;
use tracing::Level;

mod controller;
mod model;
mod shared;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let configuration = shared::configuration::initialize()?;

    let log_level = configuration
        .log_level
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let file_store = FileStore::open(&configuration.download_directory)?;
    tracing::info!("Storing audio in {:?}", file_store.directory());
    let extractor = YtDlpExtractor::new(&configuration);
    if !extractor.is_available().await {
        tracing::warn!(
            "{:?} is not runnable; downloads will fail until it is installed.",
            &configuration.yt_dlp_path
        );
    }

    let (download_queue, dispatcher) = DownloadQueue::start(Arc::new(extractor), file_store.clone());
    let state = AppState {
        file_store,
        download_queue,
    };

    let listener = tokio::net::TcpListener::bind(&configuration.server_bind_point).await?;
    tracing::info!("Listening on {}", &configuration.server_bind_point);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher.abort();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down.");
}
