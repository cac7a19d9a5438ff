//! Development server for the output directory.
//!
//! Plain static file serving: directory requests get their `index.html`,
//! everything else is served from disk as it is at request time, so rebuilt
//! pages show up on the next reload.

use axum::Router;
use std::path::Path;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("could not listen on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Router serving files under `root`.
pub fn router(root: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(TraceLayer::new_for_http())
}

/// Serve `root` on `host:port` until Ctrl-C.
pub async fn serve(root: &Path, host: &str, port: u16) -> Result<(), ServeError> {
    let listener = TcpListener::bind((host, port))
        .await
        .map_err(|source| ServeError::Bind {
            address: format!("{host}:{port}"),
            source,
        })?;
    let address = listener.local_addr()?;
    info!(address = %address, root = %root.display(), "serving");
    println!("Serving {} at http://{address}/ (Ctrl-C to stop)", root.display());

    axum::serve(listener, router(root))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Wait for Ctrl-C. If the handler cannot be installed, serve until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, stopping server"),
        Err(err) => {
            warn!("could not listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    }
}
