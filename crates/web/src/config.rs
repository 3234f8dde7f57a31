//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SIDDHA_BASE_URL` - Public URL of the site
//! - `SIDDHA_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `SUPABASE_URL` - Project URL, e.g. `https://abcd.supabase.co` (supabase backend only)
//! - `SUPABASE_ANON_KEY` - Public anon key (supabase backend only)
//!
//! ## Optional
//! - `SIDDHA_HOST` - Bind address (default: 127.0.0.1)
//! - `SIDDHA_PORT` - Listen port (default: 3000)
//! - `SIDDHA_BACKEND` - `supabase` (default) or `memory` for local development
//! - `SIDDHA_UPLOAD_BUCKET` - Storage bucket for admin uploads (default: admin-uploads)
//! - `SIDDHA_DEFAULT_WHATSAPP` - Fallback WhatsApp number (default: 919500769849)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service role key, used by the CLI only
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `LOG_FORMAT` - `pretty` (default) or `json`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default storage bucket for back-office uploads.
pub const DEFAULT_UPLOAD_BUCKET: &str = "admin-uploads";

/// WhatsApp number used when neither settings nor profile provide one.
pub const DEFAULT_WHATSAPP_NUMBER: &str = "919500769849";

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

/// Which backend implementation serves data, identity and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted Supabase project over HTTPS.
    Supabase,
    /// Process-local in-memory backend (development and tests).
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'supabase' or 'memory', got '{other}'")),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Backend selection
    pub backend: BackendKind,
    /// Hosted backend settings (present when `backend` is `Supabase`)
    pub supabase: Option<SupabaseConfig>,
    /// Storage bucket for image uploads
    pub upload_bucket: String,
    /// Fallback WhatsApp number for deep links
    pub default_whatsapp: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL (REST, auth and storage live under it)
    pub url: Url,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Service role key; bypasses row-level security, CLI only
    pub service_role_key: Option<SecretString>,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "service_role_key",
                &self.service_role_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl SiteConfig {
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

        let host = get_env_or_default("SIDDHA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SIDDHA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SIDDHA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SIDDHA_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("SIDDHA_BASE_URL")?;
        let session_secret = get_validated_secret("SIDDHA_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SIDDHA_SESSION_SECRET")?;

        let backend = get_env_or_default("SIDDHA_BACKEND", "supabase")
            .parse::<BackendKind>()
            .map_err(|e| ConfigError::InvalidEnvVar("SIDDHA_BACKEND".to_string(), e))?;
        let supabase = match backend {
            BackendKind::Supabase => Some(SupabaseConfig::from_env()?),
            BackendKind::Memory => None,
        };

        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            backend,
            supabase,
            upload_bucket: get_env_or_default("SIDDHA_UPLOAD_BUCKET", DEFAULT_UPLOAD_BUCKET),
            default_whatsapp: get_env_or_default(
                "SIDDHA_DEFAULT_WHATSAPP",
                DEFAULT_WHATSAPP_NUMBER,
            ),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            log_format,
        })
    }

    /// Configuration for the in-memory backend on a loopback address.
    ///
    /// Used by tests and `SIDDHA_BACKEND=memory` style local runs where no
    /// environment is available.
    #[must_use]
    pub fn local(base_url: &str) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: base_url.to_string(),
            session_secret: SecretString::from("local-only-session-key-9f3Kq2Lw8Zx1Vb7N"),
            backend: BackendKind::Memory,
            supabase: None,
            upload_bucket: DEFAULT_UPLOAD_BUCKET.to_string(),
            default_whatsapp: DEFAULT_WHATSAPP_NUMBER.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
            log_format: LogFormat::Pretty,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// True when cookies must be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    /// Load Supabase settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL or anon key is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidEnvVar(
                "SUPABASE_URL".to_string(),
                "must include a host".to_string(),
            ));
        }

        let service_role_key = match get_optional_env("SUPABASE_SERVICE_ROLE_KEY") {
            Some(value) => {
                validate_secret_strength(&value, "SUPABASE_SERVICE_ROLE_KEY")?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        Ok(Self {
            url,
            anon_key: get_required_secret("SUPABASE_ANON_KEY")?,
            service_role_key,
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

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
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
    let len = s.chars().count() as f64;
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
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
