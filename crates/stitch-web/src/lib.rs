//! HTTP wrapper for tracestitch
//!
//! Implements the entry contract consumed by the browser front end: input
//! `{id}`, output `{spans}`, 400 on missing input, 500 on upstream/server
//! failure. Presentation itself lives elsewhere; this layer only frames the
//! engine's result as JSON.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stitch_core::config::WebSettings;
use stitch_core::Span;
use stitch_engine::Engine;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub engine: Engine,
}

#[derive(Debug, Deserialize)]
pub struct TraceParams {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TraceResponse {
    pub spans: Vec<Span>,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/trace", get(get_trace))
        .route("/api/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and block until it exits.
pub async fn start_server(config: WebSettings, engine: Engine) -> anyhow::Result<()> {
    let state = Arc::new(AppState { engine });
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Trace API available at http://{}/api/trace", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `GET /api/trace?id=...` — reconstruct and return the enriched span list.
async fn get_trace(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TraceParams>,
) -> Response {
    let Some(id) = params.id.filter(|id| !id.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing parameter 'id'");
    };

    match state.engine.reconstruct(&id).await {
        Ok(spans) => (StatusCode::OK, Json(TraceResponse { spans })).into_response(),
        Err(err) => {
            error!("Trace reconstruction failed: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Server error: {}", err),
            )
        }
    }
}

/// Health check endpoint for probes
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "tracestitch",
        "version": stitch_core::STITCH_VERSION,
    }))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_core::StitchConfig;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            engine: Engine::new(&StitchConfig::default()),
        })
    }

    #[tokio::test]
    async fn test_missing_id_is_bad_request() {
        let response = get_trace(State(state()), Query(TraceParams { id: None })).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_blank_id_is_bad_request() {
        let response = get_trace(
            State(state()),
            Query(TraceParams {
                id: Some("   ".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
