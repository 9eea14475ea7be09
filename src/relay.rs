//! Corporate-code archive relay.
//!
//! Fetches `corpCode.xml` (which, despite the name, is a ZIP archive) and hands
//! back a pull-based byte stream. Nothing here buffers the archive; each
//! upstream chunk is yielded as soon as it arrives.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogLevel, SharedLogger};
use crate::upstream::{extract_xml_error, is_zip_content_type, DartEndpoint};

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::pin::Pin;

pub const ZIP_CONTENT_TYPE: &str = "application/zip";
pub const ZIP_CONTENT_DISPOSITION: &str = "attachment; filename=\"CORPCODE.zip\"";

pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, ProxyError>> + Send>>;

/// Request the corp-code archive and validate the upstream answered with one.
///
/// DART reports some failures with an error status and others with a 200
/// carrying an XML error document, so both the status and the content type
/// are checked before any byte is relayed.
pub async fn fetch_corp_codes(
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<ByteStream> {
    let api_key = config.resolve_api_key()?;
    let endpoint = DartEndpoint::CorpCode;
    let url = endpoint.url(&config.upstream.base_url, None, &api_key);

    logger.info("relay", format!("GET {}", endpoint.path()));

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| ProxyError::Http(e.without_url()))?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if !status.is_success() {
        let body = read_error_body(response).await?;
        logger.log_with_context(
            LogLevel::Warn,
            "relay",
            format!("Upstream error: {}", truncate(&body, 300)),
            upstream_context(status.as_u16(), content_type.as_deref()),
        );
        return Err(match extract_xml_error(&body) {
            Some((code, message)) => ProxyError::upstream(code, message),
            None => ProxyError::UpstreamStatus(status.as_u16()),
        });
    }

    if !is_zip_content_type(content_type.as_deref()) {
        let body = read_error_body(response).await?;
        logger.log_with_context(
            LogLevel::Warn,
            "relay",
            format!("Upstream did not return a ZIP: {}", truncate(&body, 300)),
            upstream_context(status.as_u16(), content_type.as_deref()),
        );
        return Err(match extract_xml_error(&body) {
            Some((code, message)) => ProxyError::upstream(code, message),
            None => ProxyError::UnexpectedPayload,
        });
    }

    if let Some(len) = response.content_length() {
        logger.debug("relay", format!("Upstream declared {} bytes", len));
    }

    let byte_stream = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| ProxyError::Http(e.without_url())));

    Ok(Box::pin(relay_stream(byte_stream, logger.clone())))
}

/// Forward chunks one at a time.
///
/// The first upstream error is passed on so the HTTP layer aborts the
/// response; nothing is yielded after it. Headers are already out by then, so
/// a JSON error body is never attempted.
pub fn relay_stream(
    upstream: impl Stream<Item = std::result::Result<Bytes, ProxyError>> + Send + 'static,
    logger: SharedLogger,
) -> impl Stream<Item = std::result::Result<Bytes, ProxyError>> + Send + 'static {
    async_stream::stream! {
        let mut relayed: u64 = 0;
        let mut failed = false;

        tokio::pin!(upstream);

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    relayed += bytes.len() as u64;
                    yield Ok(bytes);
                }
                Err(e) => {
                    logger.error(
                        "relay",
                        format!("Upstream stream failed after {} bytes: {}", relayed, e),
                    );
                    failed = true;
                    yield Err(e);
                    break;
                }
            }
        }

        if !failed {
            logger.info("relay", format!("Relay completed: {} bytes", relayed));
        }
    }
}

fn upstream_context(status: u16, content_type: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "status": status,
        "content_type": content_type,
    })
}

async fn read_error_body(response: reqwest::Response) -> Result<String> {
    response
        .text()
        .await
        .map_err(|e| ProxyError::Http(e.without_url()))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
