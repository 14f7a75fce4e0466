//! HTTP surface for the tile service.
//!
//! | Method | Path               | Response                              |
//! |--------|--------------------|---------------------------------------|
//! | POST   | `/find_tiles`      | JSON array of artifact filenames      |
//! | GET    | `/tiles/:filename` | Artifact bytes                        |
//! | GET    | `/health`          | `{"status": "ok"}`                    |

use std::future::Future;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

use super::error::ServiceError;
use super::service::TileService;
use crate::spatial::Viewport;

/// Build the router for a service.
pub fn router(service: TileService) -> Router {
    Router::new()
        .route("/find_tiles", post(find_tiles))
        .route("/tiles/:filename", get(get_tile))
        .route("/health", get(health))
        .with_state(service)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    service: TileService,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(
        addr = %listener.local_addr()?,
        layer_dir = %service.layer_dir().display(),
        "Tile server listening"
    );

    axum::serve(
        listener,
        router(service).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn find_tiles(
    State(service): State<TileService>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(viewport): Json<Viewport>,
) -> Result<Json<Vec<String>>, ServiceError> {
    let tiles = service.find_tiles(addr.ip(), viewport).await?;
    Ok(Json(tiles.as_ref().clone()))
}

async fn get_tile(
    State(service): State<TileService>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let bytes = service.read_artifact(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type(&filename))], bytes))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn content_type(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("geojson") => "application/geo+json",
        Some("json") | Some("topojson") => "application/json",
        _ => "application/octet-stream",
    }
}
