use std::env::var;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

use crate::RateLimitConfig;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 16777216 = 16MB)
    /// Uploads carry a whole game plus its cover, so this is larger than a JSON API needs
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Server port
    /// Env: PORT (default: 5000)
    pub port: u16,

    /// Directory holding users.json, games.json and sequences.json
    /// Env: DATA_DIR (default: "data")
    pub data_dir: PathBuf,

    /// Root for uploaded files; games/ and images/ live underneath
    /// Env: STATIC_DIR (default: "static")
    pub static_dir: PathBuf,

    /// How long a login session stays valid, in seconds
    /// Env: SESSION_TTL_SECS (default: 604800 = 7 days)
    pub session_ttl: Duration,

    /// Whether to rate limit requests per client IP
    /// Env: RATE_LIMIT_ENABLED (default: true)
    pub rate_limit_enabled: bool,

    /// Rate limit for /login and /register (requests per minute)
    /// Env: RATE_LIMIT_AUTH_PER_MIN (default: 10)
    pub rate_limit_auth_per_min: u64,

    /// Burst size for /login and /register
    /// Env: RATE_LIMIT_AUTH_BURST (default: 5)
    pub rate_limit_auth_burst: u32,

    /// Rate limit for everything else (requests per second)
    /// Env: RATE_LIMIT_GENERAL_PER_SEC (default: 10)
    pub rate_limit_general_per_sec: u64,

    /// Burst size for everything else
    /// Env: RATE_LIMIT_GENERAL_BURST (default: 50)
    pub rate_limit_general_burst: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();
        Self {
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            request_timeout: Duration::from_secs(env_or_default(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            port: env_or_default("PORT", defaults.port),
            data_dir: env_or_default_path("DATA_DIR", defaults.data_dir),
            static_dir: env_or_default_path("STATIC_DIR", defaults.static_dir),
            session_ttl: Duration::from_secs(env_or_default(
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )),
            rate_limit_enabled: env_or_default("RATE_LIMIT_ENABLED", defaults.rate_limit_enabled),
            rate_limit_auth_per_min: env_or_default(
                "RATE_LIMIT_AUTH_PER_MIN",
                defaults.rate_limit_auth_per_min,
            ),
            rate_limit_auth_burst: env_or_default(
                "RATE_LIMIT_AUTH_BURST",
                defaults.rate_limit_auth_burst,
            ),
            rate_limit_general_per_sec: env_or_default(
                "RATE_LIMIT_GENERAL_PER_SEC",
                defaults.rate_limit_general_per_sec,
            ),
            rate_limit_general_burst: env_or_default(
                "RATE_LIMIT_GENERAL_BURST",
                defaults.rate_limit_general_burst,
            ),
        }
    }

    /// Rate limits to install, or `None` when disabled
    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.rate_limit_enabled.then(|| RateLimitConfig {
            auth_per_min: self.rate_limit_auth_per_min,
            auth_burst: self.rate_limit_auth_burst,
            general_per_sec: self.rate_limit_general_per_sec,
            general_burst: self.rate_limit_general_burst,
        })
    }
}

impl Default for Config {
    /// Create configuration with all default values
    fn default() -> Self {
        Self {
            request_body_limit: 16 * 1024 * 1024, // 16 MB
            request_timeout: Duration::from_secs(30),
            port: 5000,
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("static"),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            rate_limit_enabled: true,
            rate_limit_auth_per_min: 10,
            rate_limit_auth_burst: 5,
            rate_limit_general_per_sec: 10,
            rate_limit_general_burst: 50,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Read a path from the environment or return the default
fn env_or_default_path(key: &str, default: PathBuf) -> PathBuf {
    var(key).map(PathBuf::from).unwrap_or(default)
}
