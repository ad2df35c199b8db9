mod analysis;
mod auth;
mod config;
mod errors;
mod models;
mod pdf;
mod providers;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::analyzer::ResumeAnalyzer;
use crate::analysis::cache::ResponseCache;
use crate::auth::JwtVerifier;
use crate::config::Config;
use crate::pdf::PdfExtractor;
use crate::providers::build_chain;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{PgDocumentStore, S3ObjectStore};

const DB_MAX_CONNECTIONS: u32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matcher API v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {config:?}");

    let documents = PgDocumentStore::connect(&config.database_url, DB_MAX_CONNECTIONS).await?;

    let s3 = build_s3_client(&config).await;
    let objects = S3ObjectStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_base_url.clone(),
    );
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let http = reqwest::Client::builder()
        .user_agent(concat!("matcher/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let chain = build_chain(&config, http);
    info!(
        "Provider chain: [{}]",
        chain.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
    );

    let capacity = NonZeroUsize::new(config.cache_max_entries)
        .context("CACHE_MAX_ENTRIES must be greater than zero")?;
    let cache = Arc::new(ResponseCache::new(config.cache_ttl, capacity));
    let analyzer = ResumeAnalyzer::new(cache, chain, config.max_provider_attempts);

    let state = AppState {
        documents: Arc::new(documents),
        objects: Arc::new(objects),
        analyzer: Arc::new(analyzer),
        pdf: Arc::new(PdfExtractor::new(config.pdf_max_workers)),
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "matcher-env",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
