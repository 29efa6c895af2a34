//! The palisade gateway server.
//!
//! ```text
//! palisade --config palisade.yaml [--listen 0.0.0.0:8000]
//! ```
//!
//! Loads the configuration and the JSON schema catalog, connects the store
//! adapters, and serves the gateway router. Log verbosity follows
//! `RUST_LOG`.

#![forbid(unsafe_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use palisade::store::{MongoStore, S3Blobs};
use palisade::{routes, GatewayConfig, GatewayState};
use palisade_core::SchemaRegistry;

/// Label-driven redaction gateway over a document store.
#[derive(Parser)]
#[command(name = "palisade", version, about)]
struct Cli {
    /// Path to the gateway configuration file.
    #[arg(short, long, default_value = "palisade.yaml")]
    config: PathBuf,

    /// Listen address override, e.g. `0.0.0.0:8000`.
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::load(&cli.config)
        .with_context(|| format!("failed to load config: {}", cli.config.display()))?;

    let catalog_text = fs::read_to_string(&config.schema_source).with_context(|| {
        format!(
            "failed to read schema catalog: {}",
            config.schema_source.display(),
        )
    })?;
    let catalog: serde_json::Value =
        serde_json::from_str(&catalog_text).context("failed to parse schema catalog")?;
    let registry = SchemaRegistry::from_catalog(&catalog);
    tracing::info!(
        resources = registry.resources().count(),
        "schema catalog loaded",
    );

    let store = MongoStore::connect(&config)
        .await
        .context("failed to connect to the document store")?;
    let blobs = S3Blobs::connect(&config).await;

    let state = Arc::new(GatewayState::new(
        registry,
        Arc::new(store),
        Arc::new(blobs),
        config.attachment_mode,
    ));
    let app = routes::router(state);

    let listen = cli.listen.unwrap_or(config.listen);
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid listen address: {listen}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "palisade listening");

    axum::serve(listener, app)
        .await
        .context("server error")?;
    Ok(())
}
