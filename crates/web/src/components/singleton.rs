//! Single-row tables that are provisioned on first admin access.

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::db::{Record, RepositoryError, Table};
use crate::supabase::Query;

/// Held across find-or-insert so concurrent requests in this process
/// provision at most one row.
static PROVISIONING: Mutex<()> = Mutex::const_new(());

fn oldest_first() -> Query {
    Query::new().order_asc("created_at").limit(1)
}

/// A record whose table holds exactly one logical row.
pub trait SingletonRecord: Record {
    /// Columns inserted when the row is provisioned.
    fn defaults() -> Value;
}

/// Lifecycle of a singleton row as seen by one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingletonState<T> {
    /// Not known to exist yet.
    Absent,
    /// Confirmed missing; the default row is being inserted.
    Provisioning,
    /// The row exists.
    Present(T),
}

/// Tracks one singleton row through `Absent -> Provisioning -> Present`.
#[derive(Debug, Clone)]
pub struct Singleton<T> {
    state: SingletonState<T>,
}

impl<T> Default for Singleton<T> {
    fn default() -> Self {
        Self {
            state: SingletonState::Absent,
        }
    }
}

impl<T: SingletonRecord> Singleton<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &SingletonState<T> {
        &self.state
    }

    /// Return the row, fetching it and inserting defaults if it is missing.
    ///
    /// Idempotent: once present, no further backend calls are made. When
    /// another writer (a second process, or the CLI seeder) provisioned the
    /// table at the same time, the oldest row wins and the row inserted
    /// here is deleted.
    ///
    /// # Errors
    ///
    /// Returns the backend error and falls back to `Absent`.
    #[instrument(skip_all, fields(table = T::TABLE))]
    pub async fn ensure_exists(&mut self, table: &Table<'_, T>) -> Result<&T, RepositoryError> {
        if !matches!(self.state, SingletonState::Present(_)) {
            self.state = SingletonState::Absent;
            let _guard = PROVISIONING.lock().await;

            let row = match table.find(&oldest_first()).await? {
                Some(row) => row,
                None => {
                    self.state = SingletonState::Provisioning;
                    tracing::info!("Provisioning default row");
                    match provision(table).await {
                        Ok(row) => row,
                        Err(e) => {
                            self.state = SingletonState::Absent;
                            return Err(e);
                        }
                    }
                }
            };
            self.state = SingletonState::Present(row);
        }

        match &self.state {
            SingletonState::Present(row) => Ok(row),
            SingletonState::Absent | SingletonState::Provisioning => Err(RepositoryError::NotFound),
        }
    }
}

/// Insert the default row, then settle on the oldest row in the table.
async fn provision<T: SingletonRecord>(table: &Table<'_, T>) -> Result<T, RepositoryError> {
    let inserted = table.insert(&T::defaults()).await?;
    let Some(oldest) = table.find(&oldest_first()).await? else {
        return Ok(inserted);
    };
    if oldest.row_id() == inserted.row_id() {
        return Ok(inserted);
    }

    tracing::warn!(
        kept = %oldest.row_id(),
        dropped = %inserted.row_id(),
        "Singleton provisioned concurrently; removing duplicate"
    );
    if let Err(e) = table.delete(inserted.row_id()).await {
        tracing::error!(error = %e, id = %inserted.row_id(), "Failed to remove duplicate singleton row");
    }
    Ok(oldest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use siddha_clinic_core::AppRole;
    use uuid::Uuid;

    use super::*;
    use crate::models::{AdminSettings, DoctorProfile};
    use crate::supabase::{Caller, IdentityProvider, MemoryBackend, Operation, StoreError, TableStore};

    /// Memory backend that yields before every call, like a network round trip.
    /// With `competitor` set, another writer provisions the table just before
    /// this store's first insert lands.
    struct SlowStore {
        inner: MemoryBackend,
        competitor: bool,
    }

    #[async_trait]
    impl TableStore for SlowStore {
        async fn select(
            &self,
            caller: &Caller,
            table: &str,
            query: &Query,
        ) -> Result<Vec<Value>, StoreError> {
            tokio::task::yield_now().await;
            self.inner.select(caller, table, query).await
        }

        async fn select_maybe_single(
            &self,
            caller: &Caller,
            table: &str,
            query: &Query,
        ) -> Result<Option<Value>, StoreError> {
            tokio::task::yield_now().await;
            self.inner.select_maybe_single(caller, table, query).await
        }

        async fn count(&self, caller: &Caller, table: &str, query: &Query) -> Result<u64, StoreError> {
            tokio::task::yield_now().await;
            self.inner.count(caller, table, query).await
        }

        async fn insert(&self, caller: &Caller, table: &str, row: &Value) -> Result<Value, StoreError> {
            tokio::task::yield_now().await;
            if self.competitor && self.inner.rows(table).is_empty() {
                self.inner.seed(table, DoctorProfile::defaults())?;
            }
            self.inner.insert(caller, table, row).await
        }

        async fn update(
            &self,
            caller: &Caller,
            table: &str,
            id: Uuid,
            patch: &Value,
        ) -> Result<Value, StoreError> {
            tokio::task::yield_now().await;
            self.inner.update(caller, table, id, patch).await
        }

        async fn delete(&self, caller: &Caller, table: &str, id: Uuid) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.inner.delete(caller, table, id).await
        }
    }

    async fn admin(backend: &MemoryBackend) -> Caller {
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let session = backend
            .sign_in_with_password("admin@clinic.in", "admin-pass")
            .await
            .unwrap();
        Caller::user(&session.access_token)
    }

    #[tokio::test]
    async fn test_provisions_once() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let table = Table::<DoctorProfile>::new(&backend, &caller);

        let mut first = Singleton::new();
        let profile = first.ensure_exists(&table).await.unwrap().clone();
        assert_eq!(profile.name, "Dr. Siddha Specialist");

        let mut second = Singleton::new();
        let again = second.ensure_exists(&table).await.unwrap();
        assert_eq!(again.id, profile.id);
        assert_eq!(backend.rows("doctor_profile").len(), 1);
        assert_eq!(backend.calls(Operation::Insert), 1);
    }

    #[tokio::test]
    async fn test_present_makes_no_calls() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let table = Table::<AdminSettings>::new(&backend, &caller);
        let mut settings = Singleton::new();
        settings.ensure_exists(&table).await.unwrap();
        backend.reset_calls();

        settings.ensure_exists(&table).await.unwrap();
        assert_eq!(backend.calls(Operation::SelectSingle), 0);
        assert!(matches!(settings.state(), SingletonState::Present(_)));
    }

    #[tokio::test]
    async fn test_failed_provisioning_returns_to_absent() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let table = Table::<AdminSettings>::new(&backend, &caller);
        backend.fail(Operation::Insert);

        let mut settings = Singleton::new();
        assert!(settings.ensure_exists(&table).await.is_err());
        assert_eq!(settings.state(), &SingletonState::Absent);
    }

    #[tokio::test]
    async fn test_anonymous_cannot_provision() {
        let backend = MemoryBackend::new();
        let caller = Caller::Anonymous;
        let table = Table::<DoctorProfile>::new(&backend, &caller);
        let mut profile = Singleton::new();
        assert!(profile.ensure_exists(&table).await.is_err());
        assert!(backend.rows("doctor_profile").is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_first_visits_provision_one_row() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let store = SlowStore {
            inner: backend.clone(),
            competitor: false,
        };
        let table = Table::<DoctorProfile>::new(&store, &caller);

        let mut a = Singleton::new();
        let mut b = Singleton::new();
        let (first, second) = tokio::join!(a.ensure_exists(&table), b.ensure_exists(&table));

        assert_eq!(first.unwrap().id, second.unwrap().id);
        assert_eq!(backend.rows("doctor_profile").len(), 1);
        assert_eq!(backend.calls(Operation::Insert), 1);
    }

    #[tokio::test]
    async fn test_duplicate_from_another_writer_is_removed() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let store = SlowStore {
            inner: backend.clone(),
            competitor: true,
        };
        let table = Table::<DoctorProfile>::new(&store, &caller);

        let mut profile = Singleton::new();
        let kept = profile.ensure_exists(&table).await.unwrap().id;

        let rows = backend.rows("doctor_profile");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], kept.to_string());
        assert_eq!(backend.calls(Operation::Delete), 1);
    }
}
