//! Read-only queries backing the public site.

use tracing::instrument;
use uuid::Uuid;

use super::{RepositoryError, Table};
use crate::models::{AdminSettings, DoctorProfile, Medicine, Service};
use crate::supabase::{Caller, Query, TableStore};

/// Public catalog reads.
///
/// Visibility flags are applied as query filters here and again by the
/// backend's row-level policies.
pub struct CatalogRepository<'a> {
    store: &'a dyn TableStore,
    caller: &'a Caller,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn TableStore, caller: &'a Caller) -> Self {
        Self { store, caller }
    }

    /// Active medicines, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn active_medicines(&self) -> Result<Vec<Medicine>, RepositoryError> {
        let query = Query::new().eq("is_active", true).order_desc("created_at");
        Table::<Medicine>::new(self.store, self.caller)
            .list(&query)
            .await
    }

    /// A single active medicine.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the medicine is missing or
    /// inactive.
    #[instrument(skip(self))]
    pub async fn active_medicine(&self, id: Uuid) -> Result<Medicine, RepositoryError> {
        let query = Query::new()
            .eq("id", id.to_string())
            .eq("is_active", true);
        Table::<Medicine>::new(self.store, self.caller)
            .find(&query)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Enabled services by sort order, creation order breaking ties.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn enabled_services(&self) -> Result<Vec<Service>, RepositoryError> {
        let query = Query::new()
            .eq("is_enabled", true)
            .order_asc("sort_order")
            .order_asc("created_at");
        Table::<Service>::new(self.store, self.caller)
            .list(&query)
            .await
    }

    /// The doctor profile, if provisioned.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<Option<DoctorProfile>, RepositoryError> {
        Table::<DoctorProfile>::new(self.store, self.caller)
            .find(&Query::new().order_asc("created_at").limit(1))
            .await
    }

    /// The site settings, if provisioned.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn settings(&self) -> Result<Option<AdminSettings>, RepositoryError> {
        Table::<AdminSettings>::new(self.store, self.caller)
            .find(&Query::new().order_asc("created_at").limit(1))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::supabase::MemoryBackend;

    fn seed_medicine(backend: &MemoryBackend, name: &str, active: bool) {
        backend
            .seed(
                "medicines",
                json!({
                    "name": name,
                    "category": "Syrup",
                    "price": "150",
                    "stock_status": "Available",
                    "is_active": active,
                }),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_public_catalog_shows_only_active() {
        let backend = MemoryBackend::new();
        seed_medicine(&backend, "Pain Relief Tonic", true);
        seed_medicine(&backend, "Cough Syrup", false);

        let caller = Caller::Anonymous;
        let medicines = CatalogRepository::new(&backend, &caller)
            .active_medicines()
            .await
            .unwrap();
        let names: Vec<_> = medicines.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Pain Relief Tonic"]);
    }

    #[tokio::test]
    async fn test_services_sorted_with_stable_ties() {
        let backend = MemoryBackend::new();
        for (title, sort, enabled) in [
            ("Varmam", 2, true),
            ("Naadi", 1, true),
            ("Hidden", 0, false),
            ("Thokkanam", 1, true),
        ] {
            backend
                .seed(
                    "services",
                    json!({
                        "title": title,
                        "icon": "Leaf",
                        "sort_order": sort,
                        "is_enabled": enabled,
                        "created_at": format!("2026-01-0{}T00:00:00Z", sort + 1),
                    }),
                )
                .unwrap();
        }

        let caller = Caller::Anonymous;
        let services = CatalogRepository::new(&backend, &caller)
            .enabled_services()
            .await
            .unwrap();
        let titles: Vec<_> = services.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Naadi", "Thokkanam", "Varmam"]);
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let backend = MemoryBackend::new();
        let caller = Caller::Anonymous;
        let profile = CatalogRepository::new(&backend, &caller)
            .profile()
            .await
            .unwrap();
        assert!(profile.is_none());
    }
}
