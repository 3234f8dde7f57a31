//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use super::AdminPage;
use crate::components::Toast;
use crate::db::{DashboardRepository, DashboardStats, pending_count};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: AdminPage,
    pub stats: DashboardStats,
    /// Recent consultations still marked `New`.
    pub pending: usize,
}

/// Dashboard overview: headline counts and the five latest consultations.
#[instrument(skip_all, fields(user_id = %admin.user_id))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let caller = admin.caller();
    let page = AdminPage::new(&admin, &session, "/admin").await;

    let (stats, toast) = match DashboardRepository::new(state.tables(), &caller)
        .stats(Utc::now())
        .await
    {
        Ok(stats) => (stats, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load dashboard");
            (
                DashboardStats::default(),
                Some(Toast::error("Failed to load dashboard data.")),
            )
        }
    };

    DashboardTemplate {
        page: page.with_toast(toast),
        pending: pending_count(&stats),
        stats,
    }
    .into_response()
}
