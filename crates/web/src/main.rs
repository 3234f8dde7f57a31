//! Siddha clinic site - public pages and admin back-office.
//!
//! This binary serves the website on port 3000 by default.
//!
//! # Backends
//!
//! - `SIDDHA_BACKEND=supabase` (default) talks to the hosted project using the
//!   public anon key. Row-level security on the project is the only
//!   authorization boundary.
//! - `SIDDHA_BACKEND=memory` keeps everything in process memory for local
//!   development. `SIDDHA_DEV_ADMIN_EMAIL` and `SIDDHA_DEV_ADMIN_PASSWORD`
//!   seed an admin account.

#![cfg_attr(not(test), forbid(unsafe_code))]

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siddha_clinic_core::AppRole;
use siddha_clinic_web::config::{BackendKind, LogFormat, SiteConfig};
use siddha_clinic_web::routes;
use siddha_clinic_web::state::AppState;
use siddha_clinic_web::supabase::{Backend, MemoryBackend, SupabaseClient};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SiteConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "siddha_clinic_web=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// In-memory backend, optionally with a development admin account.
fn memory_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    let (Ok(email), Ok(password)) = (
        std::env::var("SIDDHA_DEV_ADMIN_EMAIL"),
        std::env::var("SIDDHA_DEV_ADMIN_PASSWORD"),
    ) else {
        tracing::warn!("Memory backend has no admin account; set SIDDHA_DEV_ADMIN_EMAIL");
        return backend;
    };

    match backend
        .create_user(&email, &password)
        .and_then(|user_id| backend.grant_role(user_id, AppRole::Admin))
    {
        Ok(()) => tracing::info!(%email, "Seeded development admin"),
        Err(e) => tracing::error!(error = %e, "Failed to seed development admin"),
    }
    backend
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = SiteConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    init_tracing(config.log_format);

    let backend = match config.backend {
        BackendKind::Supabase => {
            let supabase = config
                .supabase
                .as_ref()
                .expect("Supabase backend selected without SUPABASE_URL");
            let client = SupabaseClient::new(supabase.url.clone(), supabase.anon_key.clone())
                .expect("Failed to create Supabase client");
            tracing::info!(url = %supabase.url, "Using Supabase backend");
            Backend::supabase(client)
        }
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backend; data is lost on restart");
            Backend::memory(memory_backend())
        }
    };

    let state = AppState::new(config.clone(), backend);

    // Build router
    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("siddha clinic site listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
