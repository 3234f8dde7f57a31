//! Website content blocks.

use tracing::instrument;

use super::{RepositoryError, Table};
use crate::models::{SEO_SECTION_KEY, SeoBlock, WebsiteContent};
use crate::supabase::{Caller, Query, TableStore};

/// Keyed content block access.
pub struct ContentRepository<'a> {
    table: Table<'a, WebsiteContent>,
}

impl<'a> ContentRepository<'a> {
    #[must_use]
    pub fn new(store: &'a dyn TableStore, caller: &'a Caller) -> Self {
        Self {
            table: Table::new(store, caller),
        }
    }

    /// The stored SEO block, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn seo(&self) -> Result<Option<WebsiteContent>, RepositoryError> {
        self.table
            .find(&Query::new().eq("section_key", SEO_SECTION_KEY).limit(1))
            .await
    }

    /// Update the SEO block in place, or insert it when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, block))]
    pub async fn save_seo(&self, block: &SeoBlock) -> Result<WebsiteContent, RepositoryError> {
        match self.seo().await? {
            Some(existing) => {
                self.table
                    .update(existing.id.as_uuid(), &block.to_patch())
                    .await
            }
            None => self.table.insert(&block.to_row()).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use siddha_clinic_core::AppRole;

    use super::*;
    use crate::supabase::{IdentityProvider, MemoryBackend};

    #[tokio::test]
    async fn test_save_seo_inserts_then_updates() {
        let backend = MemoryBackend::new();
        let admin = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(admin, AppRole::Admin).unwrap();
        let session = backend
            .sign_in_with_password("admin@clinic.in", "admin-pass")
            .await
            .unwrap();
        let caller = Caller::user(&session.access_token);
        let content = ContentRepository::new(&backend, &caller);

        let first = content
            .save_seo(&SeoBlock {
                title: "Siddha Clinic".to_string(),
                description: "Traditional care".to_string(),
            })
            .await
            .unwrap();
        let second = content
            .save_seo(&SeoBlock {
                title: "Siddha Clinic Chennai".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.title.as_deref(), Some("Siddha Clinic Chennai"));
        assert_eq!(second.content, None);
        assert_eq!(backend.rows("website_content").len(), 1);
    }
}
