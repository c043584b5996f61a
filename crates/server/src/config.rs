//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CADASTRO_SESSION_SECRET` - Secret used to sign bearer tokens (min 32 chars, high entropy)
//!
//! ## Optional
//! - `CADASTRO_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   when neither is set the server runs on the in-memory store)
//! - `CADASTRO_HOST` - Bind address (default: 127.0.0.1)
//! - `CADASTRO_PORT` - Listen port (default: 8080)
//! - `CADASTRO_BASE_URL` - Public URL (default: <http://localhost:8080>)
//! - `CADASTRO_DEBUG_ROUTES` - Mount the raw-credential debug endpoint (default: false)
//! - `STORAGE_MODE` - `local` or `supabase` (default: local)
//! - `CADASTRO_UPLOADS_DIR` - Local uploads root (default: wwwroot/uploads)
//! - `CADASTRO_MAX_UPLOAD_BYTES` - Maximum image size (default: 5 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Remote storage (required when `STORAGE_MODE=supabase`)
//! - `SUPABASE_URL` - Object storage base URL
//! - `SUPABASE_BUCKET` - Bucket name (default: produtos-imagens)
//! - `SUPABASE_OBJECT_PREFIX` - Key prefix inside the bucket (default: produtos)
//! - `SUPABASE_SERVICE_KEY` - Service key, preferred
//! - `SUPABASE_PUBLISHABLE_KEY` - Restricted key, used when no service key is set

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password).
    /// `None` selects the in-memory store.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Bearer token signing secret
    pub session_secret: SecretString,
    /// Whether the raw-credential debug endpoint is mounted
    pub debug_routes: bool,
    /// Image storage configuration
    pub storage: StorageConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Which blob storage backend handles product images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// Files under the local uploads root.
    Local,
    /// Remote object storage over HTTP.
    Remote,
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "supabase" | "remote" => Ok(Self::Remote),
            other => Err(format!("unknown storage mode '{other}' (expected local or supabase)")),
        }
    }
}

/// Image storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected backend
    pub mode: StorageMode,
    /// Local uploads root (also served at `/uploads` in local mode)
    pub uploads_dir: PathBuf,
    /// Maximum accepted image size in bytes
    pub max_upload_bytes: usize,
    /// Remote backend settings, present when `mode` is `Remote`
    pub remote: Option<RemoteStorageConfig>,
}

/// Remote object storage configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct RemoteStorageConfig {
    /// Object storage base URL (e.g., <https://project.supabase.co>)
    pub base_url: Url,
    /// Bucket holding product images
    pub bucket: String,
    /// Key prefix inside the bucket
    pub object_prefix: String,
    /// Bearer credential for the storage API
    pub api_key: SecretString,
}

impl std::fmt::Debug for RemoteStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStorageConfig")
            .field("base_url", &self.base_url.as_str())
            .field("bucket", &self.bucket)
            .field("object_prefix", &self.object_prefix)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CADASTRO_DATABASE_URL");
        let host = parse_env("CADASTRO_HOST", "127.0.0.1")?;
        let port = parse_env("CADASTRO_PORT", "8080")?;
        let base_url = get_env_or_default("CADASTRO_BASE_URL", "http://localhost:8080");
        let session_secret = get_validated_secret("CADASTRO_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "CADASTRO_SESSION_SECRET")?;
        let debug_routes = parse_env("CADASTRO_DEBUG_ROUTES", "false")?;

        let storage = StorageConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            debug_routes,
            storage,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mode: StorageMode = parse_env("STORAGE_MODE", "local")?;
        let uploads_dir = PathBuf::from(get_env_or_default("CADASTRO_UPLOADS_DIR", "wwwroot/uploads"));
        let max_upload_bytes = parse_env(
            "CADASTRO_MAX_UPLOAD_BYTES",
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;

        let remote = match mode {
            StorageMode::Local => None,
            StorageMode::Remote => Some(RemoteStorageConfig::from_env()?),
        };

        Ok(Self {
            mode,
            uploads_dir,
            max_upload_bytes,
            remote,
        })
    }
}

impl RemoteStorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let base_url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        // Service key first; the publishable key only works with public bucket policies
        let api_key = get_optional_env("SUPABASE_SERVICE_KEY")
            .or_else(|| get_optional_env("SUPABASE_PUBLISHABLE_KEY"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("SUPABASE_SERVICE_KEY".to_string()))?;

        Ok(Self {
            base_url,
            bucket: get_env_or_default("SUPABASE_BUCKET", "produtos-imagens"),
            object_prefix: get_env_or_default("SUPABASE_OBJECT_PREFIX", "produtos"),
            api_key,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
