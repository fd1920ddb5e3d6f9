use anyhow::Context;
use arcadia_backend::config::Config;
use arcadia_backend::media::MediaStore;
use arcadia_backend::{AppState, create_app};
use arcadia_db::Database;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging; RUST_LOG overrides the build default
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Arcadia server...");

    // Load configuration from environment variables or use defaults
    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, data_dir={}, static_dir={}, body_limit={}KB, timeout={}s, session_ttl={}s",
        config.port,
        config.data_dir.display(),
        config.static_dir.display(),
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
        config.session_ttl.as_secs()
    );
    let rate_limit = config.rate_limit();
    match &rate_limit {
        Some(limits) => tracing::info!(
            "Rate limits: auth={}/min (burst {}), general={}/sec (burst {})",
            limits.auth_per_min,
            limits.auth_burst,
            limits.general_per_sec,
            limits.general_burst
        ),
        None => tracing::warn!("Rate limiting is disabled"),
    }

    let db = Database::open(&config.data_dir)
        .await
        .with_context(|| format!("failed to open data directory {}", config.data_dir.display()))?;
    let media = MediaStore::new(&config.static_dir);
    media
        .ensure_dirs()
        .await
        .context("failed to prepare upload directories")?;

    let state = Arc::new(AppState::new(db, media, config.session_ttl));
    let app = create_app(
        state,
        config.request_body_limit,
        config.request_timeout,
        rate_limit,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
