use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Environment variable that overrides `auth.jwt_secret`.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";

/// Development-only signing secret used when nothing else is configured.
///
/// Anyone who knows this value can mint sessions for any account.  It is
/// refused outright when `server.production = true`.
pub const DEV_JWT_SECRET: &str = "your-secret-key-at-least-32-chars-long";

/// Minimum accepted length of a configured signing secret.
pub const MIN_SECRET_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Marks cookies `Secure` and forbids the development signing secret.
    #[serde(default)]
    pub production: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_web_dir")]
    pub web_dir: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// HMAC key used to sign and verify session tokens.
    ///
    /// Prefer the `JWT_SECRET_KEY` environment variable; this field is the
    /// fallback for deployments that cannot inject env vars.
    /// Read once at startup; rotating it invalidates every live session.
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:3000"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AuthConfig {
    /// Resolve the signing secret with `JWT_SECRET_KEY` taking priority over
    /// the config file field.  `None` when neither is set.
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        self.resolve_jwt_secret_with(std::env::var(JWT_SECRET_ENV).ok())
    }

    /// Same as [`resolved_jwt_secret`](Self::resolved_jwt_secret) with the
    /// environment value passed in explicitly.
    pub fn resolve_jwt_secret_with(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|s| !s.is_empty())
            .or_else(|| self.jwt_secret.clone())
            .filter(|s| !s.is_empty())
    }

    /// The secret handed to the token codec: the resolved one, or the
    /// development constant with a loud warning.
    pub fn signing_secret(&self) -> String {
        match self.resolved_jwt_secret() {
            Some(secret) => secret,
            None => {
                warn!(
                    "No {} or auth.jwt_secret configured; using the development secret. \
                     Never run like this in production.",
                    JWT_SECRET_ENV
                );
                DEV_JWT_SECRET.to_string()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
            production: false,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            web_dir: default_web_dir(),
            database_url: default_database_url(),
        }
    }
}

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    3000
}

pub fn default_max_connections() -> usize {
    1000
}

pub fn default_request_timeout() -> u64 {
    30
}

pub fn default_web_dir() -> String {
    "web".to_string()
}

pub fn default_database_url() -> String {
    "sqlite://referral.db?mode=rwc".to_string()
}
