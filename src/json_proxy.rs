//! Financial-statement query forwarding.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::SharedLogger;
use crate::upstream::DartEndpoint;

use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use serde::de::IgnoredAny;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Upstream status and body, relayed to the caller unchanged.
///
/// `body` is the upstream bytes as received, already checked to be one
/// well-formed JSON document.
#[derive(Debug)]
pub struct JsonReply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Forward the caller's raw query string to `fnlttSinglAcntAll.json`.
///
/// DART answers this endpoint with JSON even for business errors, so the body
/// is validated whatever the status is. It is never re-serialized: number
/// literals and key order reach the caller exactly as DART wrote them.
pub async fn forward_query(
    query: Option<&str>,
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<JsonReply> {
    let api_key = config.resolve_api_key()?;
    let query = query
        .filter(|q| !q.is_empty())
        .ok_or(ProxyError::MissingParameters)?;

    let endpoint = DartEndpoint::SingleCompanyAccounts;
    let url = endpoint.url(&config.upstream.base_url, Some(query), &api_key);

    logger.info("json_proxy", format!("GET {}?{}", endpoint.path(), query));

    let response = client
        .get(&url)
        .header(ACCEPT, JSON_CONTENT_TYPE)
        .send()
        .await
        .map_err(|e| ProxyError::Http(e.without_url()))?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let raw = response
        .bytes()
        .await
        .map_err(|e| ProxyError::Http(e.without_url()))?;
    serde_json::from_slice::<IgnoredAny>(&raw)?;

    logger.debug(
        "json_proxy",
        format!("Response status={} body_len={}", status.as_u16(), raw.len()),
    );

    Ok(JsonReply { status, body: raw })
}
