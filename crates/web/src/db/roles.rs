//! Role lookups in `user_roles`.

use serde::Deserialize;
use tracing::instrument;

use siddha_clinic_core::{AppRole, UserId};

use super::RepositoryError;
use crate::supabase::{Caller, Query, TableStore};

const TABLE: &str = "user_roles";

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

/// Read-only access to role grants.
///
/// Grants are written out of band with the service role key; this process
/// only ever reads them, and only through the caller's own policies.
pub struct RoleRepository<'a> {
    store: &'a dyn TableStore,
}

impl<'a> RoleRepository<'a> {
    /// Create a new role repository.
    #[must_use]
    pub const fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Whether `user_id` holds `role`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or a row cannot be decoded.
    #[instrument(skip(self, caller), fields(user_id = %user_id, role = %role))]
    pub async fn has_role(
        &self,
        caller: &Caller,
        user_id: UserId,
        role: AppRole,
    ) -> Result<bool, RepositoryError> {
        let query = Query::new()
            .eq("user_id", user_id.to_string())
            .eq("role", role.to_string())
            .limit(1);
        let rows = self.store.select(caller, TABLE, &query).await?;

        for row in rows {
            let row: RoleRow = super::decode(row)?;
            if row.role.parse::<AppRole>().is_ok_and(|r| r == role) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::supabase::{IdentityProvider, MemoryBackend};

    #[tokio::test]
    async fn test_has_role_reads_own_grant() {
        let backend = MemoryBackend::new();
        let admin = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(admin, AppRole::Admin).unwrap();
        let session = backend
            .sign_in_with_password("admin@clinic.in", "admin-pass")
            .await
            .unwrap();

        let roles = RoleRepository::new(&backend);
        let caller = Caller::user(&session.access_token);
        assert!(roles.has_role(&caller, admin, AppRole::Admin).await.unwrap());
        assert!(!roles.has_role(&caller, admin, AppRole::Moderator).await.unwrap());
    }

    #[tokio::test]
    async fn test_anonymous_sees_no_roles() {
        let backend = MemoryBackend::new();
        let admin = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(admin, AppRole::Admin).unwrap();

        let roles = RoleRepository::new(&backend);
        assert!(
            !roles
                .has_role(&Caller::Anonymous, admin, AppRole::Admin)
                .await
                .unwrap()
        );
    }
}
