//! Typed repositories over the hosted backend's tables.
//!
//! # Tables
//!
//! - `doctor_profile` - single doctor profile row
//! - `admin_settings` - single site settings row
//! - `medicines` - catalog, publicly readable when active
//! - `services` - service list, publicly readable when enabled
//! - `website_content` - keyed content blocks (SEO)
//! - `consultation_requests` - admin only
//! - `medicine_inquiries` - admin only
//! - `user_roles` - role grants, managed out of band
//!
//! Rows travel as JSON. [`Table`] decodes them into [`Record`] types and
//! reports shape mismatches as [`RepositoryError::DataCorruption`].

pub mod catalog;
pub mod content;
pub mod dashboard;
pub mod roles;

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::supabase::{Caller, Query, StoreError, TableStore};

pub use catalog::CatalogRepository;
pub use content::ContentRepository;
pub use dashboard::{DashboardRepository, DashboardStats, pending_count};
pub use roles::RoleRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Backend call failed.
    #[error("backend error: {0}")]
    Store(#[from] StoreError),

    /// A row did not have the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

impl RepositoryError {
    /// True when retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }

    /// Short message suitable for an admin toast.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(StoreError::Forbidden(_) | StoreError::Unauthorized) => {
                "You are not allowed to perform this action.".to_string()
            }
            Self::Store(StoreError::Rejected(message) | StoreError::Conflict(message)) => {
                message.clone()
            }
            Self::NotFound | Self::Store(StoreError::NotFound) => {
                "The record no longer exists.".to_string()
            }
            _ => "The server could not be reached. Please try again.".to_string(),
        }
    }
}

/// A row type stored in a named backend table.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Backend table name.
    const TABLE: &'static str;

    /// Primary key.
    fn row_id(&self) -> Uuid;
}

/// Decode a backend row.
///
/// # Errors
///
/// Returns [`RepositoryError::DataCorruption`] when the row does not match `T`.
pub fn decode<T: DeserializeOwned>(row: Value) -> Result<T, RepositoryError> {
    serde_json::from_value(row).map_err(|e| RepositoryError::DataCorruption(e.to_string()))
}

/// Typed access to one table on behalf of one caller.
pub struct Table<'a, T> {
    store: &'a dyn TableStore,
    caller: &'a Caller,
    _record: PhantomData<fn() -> T>,
}

impl<'a, T: Record> Table<'a, T> {
    /// Create a table handle.
    #[must_use]
    pub fn new(store: &'a dyn TableStore, caller: &'a Caller) -> Self {
        Self {
            store,
            caller,
            _record: PhantomData,
        }
    }

    /// The caller requests are made for.
    #[must_use]
    pub const fn caller(&self) -> &Caller {
        self.caller
    }

    /// Every row matching the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or a row cannot be decoded.
    pub async fn list(&self, query: &Query) -> Result<Vec<T>, RepositoryError> {
        let rows = self.store.select(self.caller, T::TABLE, query).await?;
        rows.into_iter().map(decode).collect()
    }

    /// The single row matching the query, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or the row cannot be decoded.
    pub async fn find(&self, query: &Query) -> Result<Option<T>, RepositoryError> {
        self.store
            .select_maybe_single(self.caller, T::TABLE, query)
            .await?
            .map(decode)
            .transpose()
    }

    /// The row with the given id, if visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or the row cannot be decoded.
    pub async fn get(&self, id: Uuid) -> Result<Option<T>, RepositoryError> {
        self.find(&Query::new().eq("id", id.to_string())).await
    }

    /// Number of rows matching the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn count(&self, query: &Query) -> Result<u64, RepositoryError> {
        Ok(self.store.count(self.caller, T::TABLE, query).await?)
    }

    /// Insert a row, returning it with server-generated columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert or the returned row
    /// cannot be decoded.
    pub async fn insert(&self, row: &Value) -> Result<T, RepositoryError> {
        decode(self.store.insert(self.caller, T::TABLE, row).await?)
    }

    /// Apply a partial update, returning the updated row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update or the returned row
    /// cannot be decoded.
    pub async fn update(&self, id: Uuid, patch: &Value) -> Result<T, RepositoryError> {
        decode(self.store.update(self.caller, T::TABLE, id, patch).await?)
    }

    /// Delete the row with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        Ok(self.store.delete(self.caller, T::TABLE, id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::Service;
    use crate::supabase::MemoryBackend;

    #[tokio::test]
    async fn test_decode_failure_is_data_corruption() {
        let backend = MemoryBackend::new();
        backend.seed("services", json!({"title": 42, "is_enabled": true})).unwrap();

        let caller = Caller::Anonymous;
        let table = Table::<Service>::new(&backend, &caller);
        let err = table.list(&Query::new()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = RepositoryError::Store(StoreError::Api {
            status: 500,
            message: "pg: relation does not exist".to_string(),
        });
        assert!(!err.user_message().contains("relation"));
        assert!(err.is_transient());
    }
}
