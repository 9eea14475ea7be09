//! Start a dart-proxy server programmatically.
//!
//! Usage:
//!   export DART_API_KEY=your_40_char_key
//!   cargo run --example basic_server

use dart_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ProxyConfig::find_and_load(None)?;
    println!("Upstream: {}", config.upstream.base_url);

    let logger = SharedLogger::new("dart-proxy-example.log")?;
    let client = config.upstream.http_client()?;

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        client,
        logger,
    });

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!("  curl -OJ http://localhost:{}/api/downloadCorpCodes", port);
    println!(
        "  curl 'http://localhost:{}/api/proxy?corp_code=00126380&bsns_year=2023&reprt_code=11011&fs_div=CFS'",
        port
    );

    axum::serve(listener, app).await?;
    Ok(())
}
