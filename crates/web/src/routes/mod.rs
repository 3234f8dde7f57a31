//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home page
//! GET  /about                   - About the doctor
//! GET  /services                - Enabled services
//! GET  /medicines               - Active medicines (when selling is enabled)
//! GET  /medicines/{id}/inquire  - WhatsApp inquiry about a medicine
//! GET  /medicines/{id}/consult  - WhatsApp consult-before-buying
//! GET  /book                    - Booking form
//! POST /book                    - Validate and hand off to WhatsApp
//! GET  /contact                 - Contact form
//! POST /contact                 - Validate and hand off to WhatsApp
//!
//! GET  /health                  - Liveness
//! GET  /health/ready            - Readiness (backend reachable)
//! GET  /static/*                - Stylesheet and scripts
//!
//! /admin/*                      - Back-office, see [`admin`]
//! ```

pub mod admin;
pub mod public;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::db::CatalogRepository;
use crate::middleware::{create_session_layer, maintenance_gate};
use crate::state::AppState;
use crate::supabase::Caller;

/// Directory served under `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/web/static";

/// Create the public site routes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::home))
        .route("/about", get(public::about))
        .route("/services", get(public::services))
        .route("/medicines", get(public::medicines))
        .route("/medicines/{id}/inquire", get(public::inquire))
        .route("/medicines/{id}/consult", get(public::consult))
        .route("/book", get(public::book_page).post(public::book))
        .route("/contact", get(public::contact_page).post(public::contact))
}

/// Build the full application: public site, back-office and health checks,
/// with the maintenance gate and sessions applied.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(public_routes())
        .nest("/admin", admin::router())
        .fallback(public::not_found)
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(from_fn_with_state(state.clone(), maintenance_gate))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Reads the settings row anonymously; 503 when the backend is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match CatalogRepository::new(state.tables(), &Caller::Anonymous)
        .settings()
        .await
    {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{body::Body, http::Request, http::header};
    use tower::ServiceExt;

    use super::*;
    use crate::config::SiteConfig;
    use crate::supabase::{Backend, MemoryBackend};

    fn test_app() -> Router {
        let state = AppState::new(
            SiteConfig::local("http://localhost:3000"),
            Backend::memory(MemoryBackend::new()),
        );
        app(state)
    }

    async fn get(path: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(get("/health").await.status(), StatusCode::OK);
        assert_eq!(get("/health/ready").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_redirects_anonymous_to_login() {
        let response = get("/admin/consultations").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/admin/login");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        assert_eq!(get("/pricing").await.status(), StatusCode::NOT_FOUND);
    }
}
