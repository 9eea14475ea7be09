use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::json_proxy::{self, JSON_CONTENT_TYPE};
use crate::logging::SharedLogger;
use crate::relay::{self, ZIP_CONTENT_DISPOSITION, ZIP_CONTENT_TYPE};

use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/downloadCorpCodes", any(handle_download_corp_codes))
        .route("/api/proxy", any(handle_proxy))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_download_corp_codes(State(state): State<Arc<AppState>>) -> Response {
    let stream = match relay::fetch_corp_codes(&state.config, &state.client, &state.logger).await
    {
        Ok(s) => s,
        Err(e) => {
            log_failure(&state.logger, "Corp code download failed", &e);
            return e.into_response();
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, ZIP_CONTENT_TYPE)
        .header(CONTENT_DISPOSITION, ZIP_CONTENT_DISPOSITION)
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_proxy(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Response {
    match json_proxy::forward_query(
        query.as_deref(),
        &state.config,
        &state.client,
        &state.logger,
    )
    .await
    {
        Ok(reply) => (
            reply.status,
            [
                (CONTENT_TYPE, JSON_CONTENT_TYPE.to_string()),
                (CACHE_CONTROL, state.config.cache.header_value()),
            ],
            reply.body,
        )
            .into_response(),
        Err(e) => {
            log_failure(&state.logger, "JSON proxy failed", &e);
            e.into_response()
        }
    }
}

fn log_failure(logger: &SharedLogger, what: &str, err: &ProxyError) {
    if err.status_code().is_client_error() {
        logger.warn("server", format!("{}: {}", what, err));
    } else {
        logger.error("server", format!("{}: {}", what, err));
    }
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
