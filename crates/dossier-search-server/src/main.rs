//! Dossier Search Server
//!
//! Serves the bilingual (English/Arabic) search API:
//! - Boolean keyword search with highlighted snippets
//! - Sub-200ms typeahead behind a Redis (or in-process) suggestion cache
//! - Semantic and hybrid search over positions, documents and briefs
//!
//! Every flag can also be set through its `DOSSIER_SEARCH_*` variable.
//! Engine tuning (limits, timeouts, TTLs) comes from the environment only.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dossier_search_core::{
    AllowAll, CacheBackend, ClearanceAuthorizer, MemoryCacheBackend, ResultAuthorizer,
    SearchConfig, SearchEngine, SqliteStore,
};
use dossier_search_server::{AppState, ServerOptions, build_router, serve};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AuthorizerKind {
    /// Hide documents classified above the caller's clearance
    Clearance,
    /// Show everything
    AllowAll,
}

/// Dossier Search - bilingual hybrid search API
#[derive(Parser, Debug)]
#[command(name = "dossier-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bilingual (English/Arabic) hybrid search API")]
struct Args {
    /// Address to bind
    #[arg(long, env = "DOSSIER_SEARCH_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(long, env = "DOSSIER_SEARCH_PORT", default_value_t = 3940)]
    port: u16,

    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, env = "DOSSIER_SEARCH_DB")]
    db: Option<PathBuf>,

    /// Redis URL for the suggestion cache; in-process cache when unset
    #[arg(long, env = "DOSSIER_SEARCH_REDIS_URL")]
    redis_url: Option<String>,

    /// Key prefix for suggestion cache entries in Redis
    #[arg(long, env = "DOSSIER_SEARCH_REDIS_PREFIX", default_value = "dossier-search:")]
    redis_prefix: String,

    /// Embedding service endpoint; hash embeddings when unset
    #[arg(long, env = "DOSSIER_SEARCH_EMBEDDING_URL")]
    embedding_url: Option<String>,

    /// Bearer token for the embedding service
    #[arg(long, env = "DOSSIER_SEARCH_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Model label reported by health and stored with embeddings
    #[arg(long, env = "DOSSIER_SEARCH_EMBEDDING_MODEL", default_value = "remote")]
    embedding_model: String,

    /// Visibility policy
    #[arg(long, env = "DOSSIER_SEARCH_AUTHORIZER", value_enum, default_value = "clearance")]
    authorizer: AuthorizerKind,

    /// Clearance for requests without an x-clearance-level header
    #[arg(long, env = "DOSSIER_SEARCH_DEFAULT_CLEARANCE", default_value_t = 0)]
    default_clearance: u8,

    /// Requests served concurrently
    #[arg(long, env = "DOSSIER_SEARCH_CONCURRENCY_LIMIT", default_value_t = 256)]
    concurrency_limit: usize,

    /// Allowed CORS origins (comma-separated); any origin when empty
    #[arg(long, env = "DOSSIER_SEARCH_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Log as JSON lines
    #[arg(long, env = "DOSSIER_SEARCH_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.log_json);

    info!("Dossier Search v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the `info` default
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = SearchConfig::from_env();

    let store = SqliteStore::new(args.db.clone()).context("Failed to open search store")?;
    info!("Storage initialized successfully");

    let mut builder = SearchEngine::builder(Arc::new(store)).config(config.clone());

    builder = builder.cache_backend(cache_backend(&args, &config).await);

    if let Some(url) = &args.embedding_url {
        builder = with_remote_embeddings(builder, url, &args, &config)?;
    }

    let authorizer: Arc<dyn ResultAuthorizer> = match args.authorizer {
        AuthorizerKind::Clearance => Arc::new(ClearanceAuthorizer),
        AuthorizerKind::AllowAll => {
            warn!("Authorization disabled: every result is visible to every caller");
            Arc::new(AllowAll)
        }
    };
    builder = builder.authorizer(authorizer);

    let engine = builder.build().context("Invalid search configuration")?;

    let options = ServerOptions {
        concurrency_limit: args.concurrency_limit,
        allowed_origins: args.cors_origins.clone(),
        ..Default::default()
    };
    let router = build_router(AppState::new(Arc::new(engine), args.default_clearance), &options);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;
    serve(router, addr).await?;
    Ok(())
}

/// Redis when configured and reachable, otherwise the in-process cache
async fn cache_backend(args: &Args, config: &SearchConfig) -> Arc<dyn CacheBackend> {
    let memory = || -> Arc<dyn CacheBackend> {
        Arc::new(MemoryCacheBackend::new(config.memory_cache_capacity))
    };

    let Some(url) = &args.redis_url else {
        info!("No Redis URL configured, using in-process suggestion cache");
        return memory();
    };

    match connect_redis(url, &args.redis_prefix).await {
        Some(backend) => backend,
        None => memory(),
    }
}

#[cfg(feature = "redis-cache")]
async fn connect_redis(url: &str, prefix: &str) -> Option<Arc<dyn CacheBackend>> {
    match dossier_search_core::RedisCacheBackend::connect(url, Some(prefix)).await {
        Ok(backend) => {
            info!(prefix = %backend.prefix(), "Suggestion cache connected to Redis");
            Some(Arc::new(backend))
        }
        Err(e) => {
            warn!("Redis unavailable ({}), using in-process suggestion cache", e);
            None
        }
    }
}

#[cfg(not(feature = "redis-cache"))]
async fn connect_redis(_url: &str, _prefix: &str) -> Option<Arc<dyn CacheBackend>> {
    warn!("Built without redis-cache, ignoring Redis URL");
    None
}

#[cfg(feature = "remote-embeddings")]
fn with_remote_embeddings(
    builder: dossier_search_core::engine::SearchEngineBuilder,
    url: &str,
    args: &Args,
    config: &SearchConfig,
) -> anyhow::Result<dossier_search_core::engine::SearchEngineBuilder> {
    let client = dossier_search_core::HttpEmbeddingClient::new(
        url,
        args.embedding_api_key.clone(),
        config.embedding_timeout(),
    )
    .context("Failed to create embedding client")?
    .with_dimensions(config.embedding_dimensions)
    .with_model(args.embedding_model.clone());

    info!(endpoint = %url, model = %args.embedding_model, "Using remote embedding service");
    Ok(builder.embedder(Arc::new(client)))
}

#[cfg(not(feature = "remote-embeddings"))]
fn with_remote_embeddings(
    builder: dossier_search_core::engine::SearchEngineBuilder,
    _url: &str,
    _args: &Args,
    _config: &SearchConfig,
) -> anyhow::Result<dossier_search_core::engine::SearchEngineBuilder> {
    warn!("Built without remote-embeddings, ignoring embedding URL");
    Ok(builder)
}
