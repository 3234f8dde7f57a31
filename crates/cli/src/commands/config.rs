//! Configuration check.

use siddha_clinic_web::config::SiteConfig;

use super::CliError;

/// Load the server configuration and log a redacted summary.
///
/// # Errors
///
/// Returns the first configuration problem found.
pub fn check() -> Result<(), CliError> {
    let config = SiteConfig::from_env()?;

    tracing::info!("Configuration is valid");
    tracing::info!("  Listen:        {}", config.socket_addr());
    tracing::info!("  Base URL:      {}", config.base_url);
    tracing::info!("  Backend:       {:?}", config.backend);
    if let Some(supabase) = &config.supabase {
        tracing::info!("  Supabase:      {}", supabase.url);
        if supabase.service_role_key.is_none() {
            tracing::warn!("  SUPABASE_SERVICE_ROLE_KEY is not set; role and seed commands will fail");
        }
    }
    tracing::info!("  Upload bucket: {}", config.upload_bucket);
    tracing::info!("  WhatsApp:      {}", config.default_whatsapp);
    tracing::info!("  Sentry:        {}", if config.sentry_dsn.is_some() { "enabled" } else { "disabled" });
    Ok(())
}
