pub mod accounts;
pub mod catalog;
pub mod config;
pub mod content_filter;
pub mod error;
pub mod helpers;
pub mod media;
mod routes;
pub mod session;
pub mod validation;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::content_filter::{ContentFilter, DenylistFilter};
use crate::media::{MediaKind, MediaStore};
use crate::session::SessionStore;

pub struct AppState {
    pub db: arcadia_db::Database,
    pub sessions: SessionStore,
    pub media: MediaStore,
    pub filter: Arc<dyn ContentFilter>,
}

impl AppState {
    /// State with the built-in content filter.
    pub fn new(db: arcadia_db::Database, media: MediaStore, session_ttl: Duration) -> Self {
        Self {
            db,
            sessions: SessionStore::new(session_ttl),
            media,
            filter: Arc::new(DenylistFilter::standard()),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn ContentFilter>) -> Self {
        self.filter = filter;
        self
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per minute for /login and /register
    pub auth_per_min: u64,
    /// Burst size for /login and /register
    pub auth_burst: u32,
    /// Requests per second for everything else
    pub general_per_sec: u64,
    /// Burst size for everything else
    pub general_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_per_min: 10,
            auth_burst: 5,
            general_per_sec: 10,
            general_burst: 50,
        }
    }
}

/// Create the application router
///
/// `rate_limit` of `None` disables per-IP limiting, which is what tests want: the key
/// extractor needs the peer address that only a real listener provides.
pub fn create_app(
    state: Arc<AppState>,
    request_body_limit: usize,
    request_timeout: Duration,
    rate_limit: Option<RateLimitConfig>,
) -> Router {
    let games_dir = state.media.dir(MediaKind::Game);
    let images_dir = state.media.dir(MediaKind::Cover);

    // Credential guessing goes through these
    let auth_routes = Router::new()
        .route("/register", get(routes::session_status).post(routes::register))
        .route("/login", get(routes::session_status).post(routes::login));

    let general_routes = Router::new()
        .route("/", get(routes::index))
        .route("/about", get(routes::about))
        .route("/logout", get(routes::logout))
        .route("/upload", get(routes::upload_form).post(routes::upload))
        .route("/play/{id}", get(routes::play))
        .route("/like/{id}", get(routes::like))
        .route("/comment/{id}", post(routes::comment))
        .route(
            "/delete_comment/{id}/{comment_id}",
            get(routes::delete_comment),
        )
        .route("/delete_game/{id}", get(routes::delete_game))
        .route(
            "/update_game/{id}",
            get(routes::update_form).post(routes::update),
        )
        .route("/api/games", get(routes::api_games));

    let (auth_routes, general_routes) = match rate_limit {
        Some(limits) => {
            let auth_governor = GovernorConfigBuilder::default()
                .period(Duration::from_secs(60) / limits.auth_per_min.clamp(1, 60_000) as u32)
                .burst_size(limits.auth_burst.max(1))
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("period and burst are non-zero");

            let general_governor = GovernorConfigBuilder::default()
                .period(Duration::from_secs(1) / limits.general_per_sec.clamp(1, 1_000) as u32)
                .burst_size(limits.general_burst.max(1))
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("period and burst are non-zero");

            (
                auth_routes.layer(GovernorLayer::new(auth_governor)),
                general_routes.layer(GovernorLayer::new(general_governor)),
            )
        }
        None => (auth_routes, general_routes),
    };

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(auth_routes)
        .merge(general_routes)
        .nest_service("/games", ServeDir::new(games_dir))
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        // Uploads are bounded by the layer below, not by axum's 2MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
