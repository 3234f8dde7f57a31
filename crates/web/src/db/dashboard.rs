//! Dashboard counters.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::instrument;

use siddha_clinic_core::{ConsultationStatus, InquiryStatus};

use super::{RepositoryError, Table};
use crate::models::{Consultation, Inquiry, Medicine};
use crate::supabase::{Caller, Query, TableStore};

/// Number of consultations listed on the dashboard.
const RECENT_LIMIT: usize = 5;

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardStats {
    pub total_consultations: u64,
    pub today_consultations: u64,
    pub total_medicines: u64,
    pub new_inquiries: u64,
    pub recent_consultations: Vec<Consultation>,
}

/// Aggregate reads for the dashboard.
pub struct DashboardRepository<'a> {
    store: &'a dyn TableStore,
    caller: &'a Caller,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn TableStore, caller: &'a Caller) -> Self {
        Self { store, caller }
    }

    /// Collect dashboard numbers as of `now`.
    ///
    /// "Today" starts at midnight UTC.
    ///
    /// # Errors
    ///
    /// Returns an error if any backend call fails.
    #[instrument(skip(self))]
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<DashboardStats, RepositoryError> {
        let consultations = Table::<Consultation>::new(self.store, self.caller);
        let medicines = Table::<Medicine>::new(self.store, self.caller);
        let inquiries = Table::<Inquiry>::new(self.store, self.caller);

        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        let today = Query::new().gte(
            "created_at",
            midnight.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        let total_consultations = consultations.count(&Query::new()).await?;
        let today_consultations = consultations.count(&today).await?;
        let total_medicines = medicines.count(&Query::new()).await?;
        let new_inquiries = inquiries
            .count(&Query::new().eq("status", InquiryStatus::New.as_str()))
            .await?;
        let recent_consultations = consultations
            .list(&Query::new().order_desc("created_at").limit(RECENT_LIMIT))
            .await?;

        Ok(DashboardStats {
            total_consultations,
            today_consultations,
            total_medicines,
            new_inquiries,
            recent_consultations,
        })
    }
}

/// Count of `New` consultations among the recent ones, for the badge.
#[must_use]
pub fn pending_count(stats: &DashboardStats) -> usize {
    stats
        .recent_consultations
        .iter()
        .filter(|c| c.status == ConsultationStatus::New)
        .count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use siddha_clinic_core::AppRole;

    use super::*;
    use crate::supabase::{IdentityProvider, MemoryBackend};

    #[tokio::test]
    async fn test_stats_counts_today_and_new() {
        let backend = MemoryBackend::new();
        let admin = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(admin, AppRole::Admin).unwrap();

        for (name, created_at) in [
            ("Old", "2026-05-01T23:59:59Z"),
            ("Morning", "2026-05-02T00:00:00Z"),
            ("Noon", "2026-05-02T12:00:00Z"),
        ] {
            backend
                .seed(
                    "consultation_requests",
                    json!({
                        "patient_name": name,
                        "patient_phone": "9000000000",
                        "health_issue": "Fever",
                        "status": "New",
                        "created_at": created_at,
                    }),
                )
                .unwrap();
        }
        backend
            .seed(
                "medicine_inquiries",
                json!({
                    "medicine_name": "Tonic",
                    "customer_phone": "9000000001",
                    "inquiry_date": "2026-05-02T09:00:00Z",
                    "status": "Replied",
                }),
            )
            .unwrap();

        let session = backend
            .sign_in_with_password("admin@clinic.in", "admin-pass")
            .await
            .unwrap();
        let caller = Caller::user(&session.access_token);
        let now = Utc.with_ymd_and_hms(2026, 5, 2, 15, 0, 0).unwrap();
        let stats = DashboardRepository::new(&backend, &caller)
            .stats(now)
            .await
            .unwrap();

        assert_eq!(stats.total_consultations, 3);
        assert_eq!(stats.today_consultations, 2);
        assert_eq!(stats.new_inquiries, 0);
        assert_eq!(stats.recent_consultations[0].patient_name, "Noon");
        assert_eq!(pending_count(&stats), 3);
    }
}
