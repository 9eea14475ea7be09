use clap::Parser;
use dart_proxy::config::config_search_paths;
use dart_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "dart-proxy",
    about = "Key-hiding CORS proxy for the DART open financial-disclosure API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Request log file path (JSONL)
    #[arg(long, default_value = "dart-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dart_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    // The key is read per request; a missing one is reported to callers, not fatal here.
    if config.resolve_api_key().is_err() {
        warn!(
            "Environment variable '{}' is not set; every request will fail until it is",
            config.upstream.api_key_env
        );
    }

    info!("dart-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:  {}", config.upstream.base_url);
    info!("  Key env:   {}", config.upstream.api_key_env);
    info!("  Cache:     {}", config.cache.header_value());
    info!("  Port:      {}", config.port);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting dart-proxy upstream={} port={}",
            config.upstream.base_url, config.port
        ),
    );

    let client = config.upstream.http_client()?;

    let state = Arc::new(AppState {
        config: config.clone(),
        client,
        logger,
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  GET /api/downloadCorpCodes");
    info!("  GET /api/proxy?corp_code=...&bsns_year=...&reprt_code=...&fs_div=...");

    axum::serve(listener, app).await?;

    Ok(())
}
