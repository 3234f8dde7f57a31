//! End-to-end tests for the Siddha clinic site.
//!
//! Each test boots the full router on an ephemeral port over the in-memory
//! backend, then drives it with a cookie-keeping HTTP client. Nothing
//! external is needed:
//!
//! ```bash
//! cargo test -p siddha-clinic-integration-tests
//! ```
//!
//! Redirects are not followed, so tests can assert on `Location` headers
//! (including the `wa.me` hand-offs).

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;

use reqwest::{Client, Response, StatusCode, header};
use serde_json::Value;

use siddha_clinic_core::AppRole;
use siddha_clinic_web::config::SiteConfig;
use siddha_clinic_web::routes;
use siddha_clinic_web::state::AppState;
use siddha_clinic_web::supabase::{Backend, MemoryBackend};

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running site plus a client holding its session cookie.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    /// Direct handle on the data behind the site.
    pub backend: MemoryBackend,
}

impl TestApp {
    /// Start the site on `127.0.0.1:0` with an empty backend.
    pub async fn spawn() -> Self {
        Self::spawn_with(MemoryBackend::new()).await
    }

    /// Start the site over a prepared backend.
    pub async fn spawn_with(backend: MemoryBackend) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let config = SiteConfig::local(&format!("http://{addr}"));
        let state = AppState::new(config, Backend::memory(backend.clone()));
        let app = routes::app(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            addr,
            client: client(),
            backend,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Register an account, optionally as admin, without signing in.
    pub fn create_account(&self, email: &str, role: Option<AppRole>) {
        let user_id = self
            .backend
            .create_user(email, PASSWORD)
            .expect("Failed to create user");
        if let Some(role) = role {
            self.backend
                .grant_role(user_id, role)
                .expect("Failed to grant role");
        }
    }

    /// Create an admin account and sign this client in as it.
    pub async fn sign_in_admin(&self) {
        let email = "doctor@clinic.test";
        self.create_account(email, Some(AppRole::Admin));
        let response = self
            .post_form("/admin/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/admin");
    }

    /// Insert a row as the service role.
    pub fn seed(&self, table: &str, row: Value) -> Value {
        self.backend.seed(table, row).expect("Failed to seed row")
    }

    /// Id of a seeded row.
    #[must_use]
    pub fn id_of(row: &Value) -> String {
        row["id"].as_str().expect("Row has no id").to_string()
    }
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
