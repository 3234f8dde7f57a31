//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::services::{AuthGate, ImageUploader};
use crate::supabase::{Backend, TableStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    backend: Backend,
    auth: AuthGate,
    uploader: ImageUploader,
}

impl AppState {
    /// Create a new application state over the given backend.
    #[must_use]
    pub fn new(config: SiteConfig, backend: Backend) -> Self {
        let auth = AuthGate::new(backend.identity.clone(), backend.tables.clone());
        let uploader = ImageUploader::new(backend.storage.clone(), config.upload_bucket.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                auth,
                uploader,
            }),
        }
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Table access for repositories.
    #[must_use]
    pub fn tables(&self) -> &dyn TableStore {
        self.inner.backend.tables.as_ref()
    }

    /// The admin gate.
    #[must_use]
    pub fn auth(&self) -> &AuthGate {
        &self.inner.auth
    }

    #[must_use]
    pub fn uploader(&self) -> &ImageUploader {
        &self.inner.uploader
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("backend", &self.inner.backend)
            .finish_non_exhaustive()
    }
}
