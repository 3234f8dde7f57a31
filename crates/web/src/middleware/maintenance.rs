//! Maintenance mode for the public site.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::db::CatalogRepository;
use crate::filters;
use crate::state::AppState;
use crate::supabase::Caller;

/// Paths that stay reachable while the site is in maintenance.
const EXEMPT_PREFIXES: [&str; 3] = ["/admin", "/health", "/static"];

#[derive(Template, WebTemplate)]
#[template(path = "maintenance.html")]
pub struct MaintenanceTemplate;

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{prefix}/")))
}

/// Serve a 503 notice on public pages when `maintenance_mode` is on.
///
/// A settings read failure leaves the site up.
pub async fn maintenance_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let settings = CatalogRepository::new(state.tables(), &Caller::Anonymous)
        .settings()
        .await;
    match settings {
        Ok(Some(settings)) if settings.maintenance_mode => {
            (StatusCode::SERVICE_UNAVAILABLE, MaintenanceTemplate).into_response()
        }
        Ok(_) => next.run(request).await,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read maintenance flag");
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/admin"));
        assert!(is_exempt("/admin/settings"));
        assert!(is_exempt("/health/ready"));
        assert!(is_exempt("/static/site.css"));
        assert!(!is_exempt("/administrator"));
        assert!(!is_exempt("/"));
        assert!(!is_exempt("/medicines"));
    }
}
