use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use emsfeed::config::{Config, FileConfig};
use emsfeed::server;

#[derive(Parser, Debug)]
#[command(
    name = "emsfeed",
    about = "Republishes EMS parcel tracking status as an Atom feed"
)]
struct Args {
    /// Tracking number to watch
    #[arg(long, value_name = "ID")]
    tracking_id: String,

    /// Carrier channel code (product segment of the query URL)
    #[arg(long, default_value = "apple")]
    channel: String,

    /// Log at debug level when RUST_LOG is unset
    #[arg(long)]
    debug: bool,

    /// Address to serve on
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Carrier base URL (point at a stub for testing)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Optional TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let file = match &args.config {
        Some(path) => FileConfig::load(path).context("Failed to load config file")?,
        None => FileConfig::default(),
    };
    let config = Config::resolve(args.tracking_id, args.channel, args.bind, args.base_url, file)
        .context("Failed to resolve configuration")?;

    let bind = config.bind;
    tracing::info!(
        addr = %bind,
        channel = %config.channel,
        tracking_id = %config.tracking_id,
        upstream = %config.base_url,
        "Serving tracking feed"
    );

    let app = server::router(config)?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
