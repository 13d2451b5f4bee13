//! HTTP surface for the detail-extraction service.
//!
//! `GET /scrap?url=...` fetches the detail document and returns the
//! [`DetailExtraction`] payload — the same contract the reconciliation
//! dispatcher consumes in-process.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use url::Url;

use crate::domain::DetailExtraction;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::DetailParser;

#[derive(Clone)]
struct ApiState {
    http: HttpClient,
    parser: Arc<DetailParser>,
}

/// Serve the extraction endpoint until the process is stopped.
pub async fn serve(addr: SocketAddr, http: HttpClient, parser: DetailParser) -> anyhow::Result<()> {
    let state = ApiState {
        http,
        parser: Arc::new(parser),
    };
    let app = Router::new()
        .route("/scrap", get(scrap))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("extraction service listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ScrapQuery {
    url: String,
}

async fn scrap(
    State(state): State<ApiState>,
    Query(query): Query<ScrapQuery>,
) -> Result<Json<DetailExtraction>, (StatusCode, String)> {
    let url = Url::parse(&query.url)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid url '{}': {e}", query.url)))?;
    let body = state.http.fetch_text(url.as_str()).await.map_err(|e| {
        warn!("extraction fetch failed: {e}");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;
    Ok(Json(state.parser.extract(&body)))
}
