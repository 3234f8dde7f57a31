//! Hosted backend boundary: tables, identity and object storage.
//!
//! The site never owns its data. Every read and write goes through three
//! traits mirroring the services of a Supabase project:
//!
//! - [`TableStore`] - `PostgREST` table access (`/rest/v1`)
//! - [`IdentityProvider`] - `GoTrue` sign-in and account management (`/auth/v1`)
//! - [`ObjectStorage`] - Storage buckets (`/storage/v1`)
//!
//! [`SupabaseClient`] implements all three over HTTPS. [`MemoryBackend`]
//! implements them in-process, enforcing the same row-level policies, for
//! tests and local development.
//!
//! Every call takes a [`Caller`] so the backend, not this process, decides
//! what the request may see or change.

mod client;
mod memory;
mod query;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use siddha_clinic_core::UserId;

pub use client::SupabaseClient;
pub use memory::{MemoryBackend, Operation};
pub use query::{Filter, Order, Query};

/// Errors returned by any backend call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure (DNS, TLS, connection reset, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend temporarily unavailable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Missing, invalid or expired credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but a row-level policy denied the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The addressed row or object does not exist (or is not visible).
    #[error("Not found")]
    NotFound,

    /// Unique constraint or duplicate key.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected as invalid (bad credentials, weak password, malformed body).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// True for failures that may succeed if the caller simply tries again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Who a backend request is made on behalf of.
#[derive(Clone)]
pub enum Caller {
    /// No user session; only public policies apply.
    Anonymous,
    /// A signed-in user's access token.
    User(SecretString),
}

impl Caller {
    /// Build a caller from a raw access token.
    #[must_use]
    pub fn user(access_token: &str) -> Self {
        Self::User(SecretString::from(access_token.to_owned()))
    }

    /// The bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User(token) => Some(token.expose_secret()),
        }
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::User(_) => f.write_str("User([REDACTED])"),
        }
    }
}

/// An identity as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Address awaiting confirmation after an email change.
    #[serde(default)]
    pub new_email: Option<String>,
}

/// Tokens issued by a successful sign-in or refresh.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Result of registering a new identity.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    /// Present when the project auto-confirms new accounts.
    pub session: Option<AuthSession>,
}

/// Table-style reads and writes keyed by table name and row id.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetch every row matching the query.
    async fn select(&self, caller: &Caller, table: &str, query: &Query)
    -> Result<Vec<Value>, StoreError>;

    /// Fetch exactly one row, or none.
    async fn select_maybe_single(
        &self,
        caller: &Caller,
        table: &str,
        query: &Query,
    ) -> Result<Option<Value>, StoreError>;

    /// Count matching rows without fetching them.
    async fn count(&self, caller: &Caller, table: &str, query: &Query) -> Result<u64, StoreError>;

    /// Insert a row, returning it with server-generated columns populated.
    async fn insert(&self, caller: &Caller, table: &str, row: &Value) -> Result<Value, StoreError>;

    /// Apply a partial update to the row with the given id, returning the new row.
    async fn update(
        &self,
        caller: &Caller,
        table: &str,
        id: Uuid,
        patch: &Value,
    ) -> Result<Value, StoreError>;

    /// Delete the row with the given id.
    async fn delete(&self, caller: &Caller, table: &str, id: Uuid) -> Result<(), StoreError>;
}

/// Sign-in, registration and account management.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, StoreError>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError>;

    /// Resolve the identity behind an access token.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, StoreError>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, StoreError>;

    /// Request an email change; takes effect once the new address confirms.
    async fn update_email(&self, access_token: &str, new_email: &str)
    -> Result<AuthUser, StoreError>;

    async fn update_password(&self, access_token: &str, new_password: &str)
    -> Result<(), StoreError>;
}

/// Bucketed object storage with public URLs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        caller: &Caller,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Public URL of an object. Does not check that the object exists.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// The three backend services, shared across handlers.
#[derive(Clone)]
pub struct Backend {
    pub tables: Arc<dyn TableStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Backend {
    /// Backend served by a hosted Supabase project.
    #[must_use]
    pub fn supabase(client: SupabaseClient) -> Self {
        let client = Arc::new(client);
        Self {
            tables: client.clone(),
            identity: client.clone(),
            storage: client,
        }
    }

    /// Backend served from process memory.
    #[must_use]
    pub fn memory(backend: MemoryBackend) -> Self {
        let backend = Arc::new(backend);
        Self {
            tables: backend.clone(),
            identity: backend.clone(),
            storage: backend,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
