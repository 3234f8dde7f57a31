//! CLI command implementations.

pub mod config;
pub mod roles;
pub mod seed;

use thiserror::Error;

use siddha_clinic_web::config::{ConfigError, SupabaseConfig};
use siddha_clinic_web::db::RepositoryError;
use siddha_clinic_web::supabase::{StoreError, SupabaseClient};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Store(#[from] StoreError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A row came back without the expected columns.
    #[error("Malformed row in {table}: {message}")]
    MalformedRow {
        table: &'static str,
        message: String,
    },
}

/// Client authenticated with the service role key.
///
/// Anonymous calls through this client carry the service role key as their
/// bearer token and so bypass row-level security.
///
/// # Errors
///
/// Returns an error if the project URL or service role key is missing.
pub fn service_client() -> Result<SupabaseClient, CliError> {
    dotenvy::dotenv().ok();

    let config = SupabaseConfig::from_env()?;
    let service_key = config
        .service_role_key
        .ok_or(CliError::MissingEnvVar("SUPABASE_SERVICE_ROLE_KEY"))?;

    tracing::info!(url = %config.url, "Connecting to Supabase with the service role key");
    Ok(SupabaseClient::new(config.url, service_key)?)
}
