//! HTTP Status Server
//!
//! Serves the latest controller snapshot as JSON on `GET /status`. Every other
//! path is a 404. The store is only locked long enough to clone the snapshot;
//! serialization and socket I/O happen afterwards.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use fc_core::StatusStore;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

/// Router with the status route and a 404 fallback
pub fn router(status: Arc<StatusStore>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .fallback(not_found)
        .with_state(status)
}

/// Bind `0.0.0.0:port` and serve until the process exits
pub async fn run_server(port: u16, status: Arc<StatusStore>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Status server listening on http://{}/status", addr);

    axum::serve(listener, router(status)).await?;
    Ok(())
}

async fn get_status(State(status): State<Arc<StatusStore>>) -> Response {
    let snapshot = status.read();

    let body = match snapshot {
        Some(snapshot) => match serde_json::to_vec(&snapshot) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize status: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
        None => b"{}".to_vec(),
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE), (header::CACHE_CONTROL, NO_CACHE)],
        body,
    )
        .into_response()
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
