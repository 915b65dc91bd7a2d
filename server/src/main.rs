//! FxGate Server Binary
//!
//! Serves the currency conversion API backed by a cached external rate provider.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fxgate_server::{build_service, router, AppState, ServerConfig};

/// FxGate currency conversion server
#[derive(Parser, Debug)]
#[command(name = "fxgate")]
#[command(about = "Currency conversion API with cached exchange rates")]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Rate provider endpoint; the base currency code is appended
    #[arg(long)]
    provider_url: Option<String>,

    /// Provider request timeout in seconds
    #[arg(long)]
    provider_timeout_secs: Option<u64>,

    /// How long fetched rates are cached, in seconds
    #[arg(long)]
    cache_ttl_secs: Option<u64>,

    /// Directory of static files to serve at /
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(bind) = self.bind {
            config.listen_addr = bind;
        }
        if let Some(port) = self.port {
            config.listen_port = port;
        }
        if let Some(url) = self.provider_url {
            config.provider.base_url = url;
        }
        if let Some(secs) = self.provider_timeout_secs {
            config.provider.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if self.static_dir.is_some() {
            config.static_dir = self.static_dir;
        }
        config.json_logs |= self.json_logs;
    }
}

fn init_logging(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = ServerConfig::from_env();
    args.apply(&mut config);

    init_logging(&config);

    info!("Starting FxGate");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let service = build_service(&config)?;
    let supported: Vec<&str> = service
        .supported_currencies()
        .iter()
        .map(|c| c.code())
        .collect();

    let app = router(AppState::new(service.clone()), config.static_dir.as_deref());

    let listener = TcpListener::bind(config.bind_address()).await?;

    info!(
        listen_addr = %listener.local_addr()?,
        provider = %config.provider.base_url,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        currencies = %supported.join(", "),
        "FxGate running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("FxGate shutdown complete");
    Ok(())
}
