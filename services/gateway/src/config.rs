use std::time::Duration as StdDuration;

use serde::Deserialize;
use url::Url;

use latchkey_core::config::Config;
use latchkey_session_types::cookie::CookieSettings;

/// Minimum HMAC secret length accepted for signing session tokens.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Upper bound for any configured TTL: ten years.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Which store implementation backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Postgres via sea-orm. Sessions survive restarts.
    Postgres,
    /// Process-local maps. For development and tests only.
    Memory,
}

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    /// Env var: `STORE_BACKEND` (`postgres` | `memory`, default `postgres`).
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    /// PostgreSQL connection URL. Required for the postgres backend.
    pub database_url: Option<String>,
    /// HMAC secret for signing session tokens.
    pub jwt_secret: String,
    /// Externally reachable base URL that magic links point at
    /// (e.g. "https://login.example.com").
    pub public_base_url: String,
    /// Cookie `Domain` attribute; unset means host-only.
    pub cookie_domain: Option<String>,
    #[serde(default = "default_true")]
    pub cookie_secure: bool,
    /// TCP port to listen on. Env var: `GATEWAY_PORT`.
    #[serde(default = "default_port")]
    pub gateway_port: u16,
    #[serde(default = "default_attempt_ttl")]
    pub login_attempt_ttl_secs: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Live (unconsumed, unexpired) attempts allowed per email.
    #[serde(default = "default_max_active_attempts")]
    pub max_active_attempts: u64,
    /// Echo the magic link in the issuance response. Development only: it
    /// lets anyone who can call the API log in as any email.
    #[serde(default)]
    pub expose_link: bool,
    /// Connect/acquire timeout for the store pool.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
    /// Upper bound on handling any single request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Reaper period; `0` disables the background reaper.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

impl Config for GatewayConfig {}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_attempt_ttl() -> u64 {
    15 * 60
}

fn default_session_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_max_active_attempts() -> u64 {
    5
}

fn default_store_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_reap_interval() -> u64 {
    60 * 60
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PUBLIC_BASE_URL is not a valid http(s) base URL")]
    InvalidPublicBaseUrl,
    #[error("JWT_SECRET must be at least 32 bytes")]
    WeakJwtSecret,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("{0} must not exceed ten years")]
    DurationTooLarge(&'static str),
}

/// Validated runtime settings shared by the use cases.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub attempt_ttl: chrono::Duration,
    pub session_ttl: chrono::Duration,
    pub max_active_attempts: u64,
    pub public_base_url: Url,
    pub jwt_secret: String,
    pub cookie: CookieSettings,
    pub expose_link: bool,
}

impl GatewayConfig {
    pub fn settings(&self) -> Result<GatewaySettings, ConfigError> {
        let public_base_url =
            Url::parse(&self.public_base_url).map_err(|_| ConfigError::InvalidPublicBaseUrl)?;
        if !matches!(public_base_url.scheme(), "http" | "https")
            || public_base_url.cannot_be_a_base()
        {
            return Err(ConfigError::InvalidPublicBaseUrl);
        }
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::WeakJwtSecret);
        }
        let attempt_ttl = ttl(self.login_attempt_ttl_secs, "LOGIN_ATTEMPT_TTL_SECS")?;
        let session_ttl = ttl(self.session_ttl_secs, "SESSION_TTL_SECS")?;
        nonzero(self.store_timeout_secs, "STORE_TIMEOUT_SECS")?;
        nonzero(self.request_timeout_secs, "REQUEST_TIMEOUT_SECS")?;

        Ok(GatewaySettings {
            attempt_ttl,
            session_ttl,
            max_active_attempts: self.max_active_attempts,
            public_base_url,
            jwt_secret: self.jwt_secret.clone(),
            cookie: CookieSettings {
                domain: self.cookie_domain.clone(),
                secure: self.cookie_secure,
            },
            expose_link: self.expose_link,
        })
    }

    pub fn store_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.store_timeout_secs)
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.request_timeout_secs)
    }

    pub fn reap_interval(&self) -> Option<StdDuration> {
        (self.reap_interval_secs > 0).then(|| StdDuration::from_secs(self.reap_interval_secs))
    }
}

fn nonzero(secs: u64, name: &'static str) -> Result<u64, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::ZeroDuration(name));
    }
    Ok(secs)
}

fn ttl(secs: u64, name: &'static str) -> Result<chrono::Duration, ConfigError> {
    if nonzero(secs, name)? > MAX_TTL_SECS {
        return Err(ConfigError::DurationTooLarge(name));
    }
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or(ConfigError::DurationTooLarge(name))
}
