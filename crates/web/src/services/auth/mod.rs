//! The admin gate: session identity, role resolution, sign-in and sign-out.
//!
//! Identity and role are resolved in two steps. The access token is checked
//! with the identity service, then the role is read from `user_roles` under
//! that user's own policies. Nothing about the role is decoded from the token.

mod error;

pub use error::AuthError;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tower_sessions::Session;
use tracing::instrument;

use siddha_clinic_core::{AppRole, Email, Password, UserId};

use crate::db::{RepositoryError, RoleRepository};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{SessionIdentity, session_keys};
use crate::supabase::{AuthUser, IdentityProvider, SignUpOutcome, StoreError, TableStore};

/// How long a resolved admin flag is trusted before re-reading `user_roles`.
pub const ROLE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Reactive auth state as seen by one request.
#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    pub user: Option<SessionIdentity>,
    pub is_admin: bool,
    /// Resolution could not complete because the backend was unavailable.
    pub is_loading: bool,
}

impl AuthSnapshot {
    const fn anonymous() -> Self {
        Self {
            user: None,
            is_admin: false,
            is_loading: false,
        }
    }

    const fn loading() -> Self {
        Self {
            user: None,
            is_admin: false,
            is_loading: true,
        }
    }
}

/// What an admin-only view should render.
#[derive(Debug, Clone)]
pub enum GateOutcome {
    /// Spinner only; resolution is still pending.
    Loading,
    /// No signed-in user.
    RedirectToLogin,
    /// Signed in without the admin role. Rendered in place, never redirected.
    AccessDenied(SessionIdentity),
    /// Signed-in admin.
    Authorized(SessionIdentity),
}

/// Apply the gate's four-way branch to a snapshot.
#[must_use]
pub fn decide(snapshot: AuthSnapshot) -> GateOutcome {
    if snapshot.is_loading {
        return GateOutcome::Loading;
    }
    match snapshot.user {
        None => GateOutcome::RedirectToLogin,
        Some(user) if !snapshot.is_admin => GateOutcome::AccessDenied(user),
        Some(user) => GateOutcome::Authorized(user),
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub identity: SessionIdentity,
    pub is_admin: bool,
}

/// Mediates every sign-in, sign-up, sign-out and gate check.
///
/// Cheap to clone; clones share the role cache.
#[derive(Clone)]
pub struct AuthGate {
    identity: Arc<dyn IdentityProvider>,
    tables: Arc<dyn TableStore>,
    roles: Cache<UserId, bool>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("cached_roles", &self.roles.entry_count())
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, tables: Arc<dyn TableStore>) -> Self {
        let roles = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ROLE_CACHE_TTL)
            .build();
        Self {
            identity,
            tables,
            roles,
        }
    }

    // =========================================================================
    // Sign-in / sign-up / sign-out
    // =========================================================================

    /// Validate credentials locally, sign in once, store the identity and
    /// resolve the role.
    ///
    /// A non-admin is still signed in; the caller decides what to show.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on local validation failure, rejected
    /// credentials, or backend/session failure. Never retried.
    #[instrument(skip(self, session, password))]
    pub async fn sign_in(
        &self,
        session: &Session,
        email: &str,
        password: &str,
    ) -> Result<SignInOutcome, AuthError> {
        let email = Email::parse(email)?;
        let password = Password::parse(password)?;

        let auth = self
            .identity
            .sign_in_with_password(email.as_str(), password.expose())
            .await
            .map_err(AuthError::from_sign_in)?;
        let identity = SessionIdentity::from(auth);

        // The session only learns the identity once the role is known.
        self.roles.invalidate(&identity.user_id).await;
        let is_admin = self.is_admin(&identity).await?;

        session.cycle_id().await?;
        session.insert(session_keys::IDENTITY, &identity).await?;
        set_sentry_user(identity.user_id, identity.email.as_deref());
        tracing::info!(user_id = %identity.user_id, is_admin, "Signed in");

        Ok(SignInOutcome { identity, is_admin })
    }

    /// Register a new identity. No role is ever granted here.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on local validation failure or when the
    /// identity service rejects the registration.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let email = Email::parse(email)?;
        let password = Password::parse(password)?;

        let outcome = self
            .identity
            .sign_up(email.as_str(), password.expose())
            .await
            .map_err(AuthError::from_account_change)?;
        tracing::info!(user_id = %outcome.user.id, "Registered new account");
        Ok(outcome)
    }

    /// Clear the session, then revoke the remote session on a best-effort basis.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, session: &Session) {
        let identity = session
            .get::<SessionIdentity>(session_keys::IDENTITY)
            .await
            .ok()
            .flatten();

        if let Err(e) = session.flush().await {
            tracing::warn!(error = %e, "Failed to clear session");
        }
        clear_sentry_user();

        if let Some(identity) = identity {
            self.roles.invalidate(&identity.user_id).await;
            if let Err(e) = self.identity.sign_out(&identity.access_token).await {
                tracing::warn!(error = %e, user_id = %identity.user_id, "Remote sign-out failed");
            }
        }
    }

    // =========================================================================
    // Gate
    // =========================================================================

    /// Resolve the current session into a snapshot.
    ///
    /// Expired or rejected access tokens are refreshed once. A session the
    /// identity service no longer accepts is cleared. Backend outages yield
    /// `is_loading`.
    #[instrument(skip_all)]
    pub async fn resolve(&self, session: &Session) -> AuthSnapshot {
        let stored = match session.get::<SessionIdentity>(session_keys::IDENTITY).await {
            Ok(Some(identity)) => identity,
            Ok(None) => return AuthSnapshot::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "Session store unavailable");
                return AuthSnapshot::loading();
            }
        };

        let (identity, refreshed) = match self.verify(stored).await {
            Ok(verified) => verified,
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Identity service unavailable");
                return AuthSnapshot::loading();
            }
            Err(e) => {
                tracing::info!(error = %e, "Session no longer valid");
                let _ = session
                    .remove::<SessionIdentity>(session_keys::IDENTITY)
                    .await;
                return AuthSnapshot::anonymous();
            }
        };

        if refreshed && let Err(e) = session.insert(session_keys::IDENTITY, &identity).await {
            tracing::warn!(error = %e, "Failed to store refreshed tokens");
        }

        match self.is_admin(&identity).await {
            Ok(is_admin) => AuthSnapshot {
                user: Some(identity),
                is_admin,
                is_loading: false,
            },
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Role lookup unavailable");
                AuthSnapshot::loading()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Role lookup failed");
                AuthSnapshot {
                    user: Some(identity),
                    is_admin: false,
                    is_loading: false,
                }
            }
        }
    }

    /// Check the access token, refreshing at most once.
    async fn verify(
        &self,
        mut identity: SessionIdentity,
    ) -> Result<(SessionIdentity, bool), StoreError> {
        let mut refreshed = false;
        if identity.is_expired() {
            identity = self.refresh(&identity).await?;
            refreshed = true;
        }

        match self.identity.get_user(&identity.access_token).await {
            Ok(user) => Ok((with_user(identity, user), refreshed)),
            Err(StoreError::Unauthorized) if !refreshed => {
                let fresh = self.refresh(&identity).await?;
                let user = self.identity.get_user(&fresh.access_token).await?;
                Ok((with_user(fresh, user), true))
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, identity: &SessionIdentity) -> Result<SessionIdentity, StoreError> {
        let session = self.identity.refresh(&identity.refresh_token).await?;
        tracing::debug!(user_id = %identity.user_id, "Refreshed access token");
        Ok(SessionIdentity::from(session))
    }

    /// Role lookup keyed by the resolved user, cached for [`ROLE_CACHE_TTL`].
    async fn is_admin(&self, identity: &SessionIdentity) -> Result<bool, RepositoryError> {
        if let Some(cached) = self.roles.get(&identity.user_id).await {
            return Ok(cached);
        }
        let is_admin = RoleRepository::new(self.tables.as_ref())
            .has_role(&identity.caller(), identity.user_id, AppRole::Admin)
            .await?;
        self.roles.insert(identity.user_id, is_admin).await;
        Ok(is_admin)
    }

    // =========================================================================
    // Account security
    // =========================================================================

    /// Request an email change; it takes effect once the new address confirms.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SameEmail`] when unchanged, or a validation or
    /// backend error.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn change_email(
        &self,
        identity: &SessionIdentity,
        new_email: &str,
    ) -> Result<AuthUser, AuthError> {
        let email = Email::parse(new_email)?;
        if identity
            .email
            .as_deref()
            .is_some_and(|current| email.same_address(current))
        {
            return Err(AuthError::SameEmail);
        }
        self.identity
            .update_email(&identity.access_token, email.as_str())
            .await
            .map_err(AuthError::from_account_change)
    }

    /// Set a new password after checking length and confirmation.
    ///
    /// # Errors
    ///
    /// Returns a validation or backend error.
    #[instrument(skip_all, fields(user_id = %identity.user_id))]
    pub async fn change_password(
        &self,
        identity: &SessionIdentity,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), AuthError> {
        let password = Password::parse_confirmed(new_password, confirmation)?;
        self.identity
            .update_password(&identity.access_token, password.expose())
            .await
            .map_err(AuthError::from_account_change)
    }
}

fn with_user(mut identity: SessionIdentity, user: AuthUser) -> SessionIdentity {
    identity.user_id = user.id;
    if user.email.is_some() {
        identity.email = user.email;
    }
    identity
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::supabase::{MemoryBackend, Operation};

    fn gate(backend: &MemoryBackend) -> AuthGate {
        let shared = Arc::new(backend.clone());
        AuthGate::new(shared.clone(), shared)
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn snapshot(user: bool, is_admin: bool, is_loading: bool) -> AuthSnapshot {
        AuthSnapshot {
            user: user.then(|| SessionIdentity {
                user_id: UserId::random(),
                email: None,
                access_token: String::new(),
                refresh_token: String::new(),
                expires_at: None,
            }),
            is_admin,
            is_loading,
        }
    }

    #[test]
    fn test_decide_branches() {
        assert!(matches!(decide(snapshot(false, false, true)), GateOutcome::Loading));
        assert!(matches!(decide(snapshot(true, true, true)), GateOutcome::Loading));
        assert!(matches!(
            decide(snapshot(false, false, false)),
            GateOutcome::RedirectToLogin
        ));
        assert!(matches!(
            decide(snapshot(true, false, false)),
            GateOutcome::AccessDenied(_)
        ));
        assert!(matches!(
            decide(snapshot(true, true, false)),
            GateOutcome::Authorized(_)
        ));
    }

    #[tokio::test]
    async fn test_sign_in_validates_before_calling_backend() {
        let backend = MemoryBackend::new();
        let gate = gate(&backend);
        let session = session();

        let err = gate.sign_in(&session, "not-an-email", "secret-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        let err = gate.sign_in(&session, "a@clinic.in", "123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword(_)));
        assert_eq!(backend.calls(Operation::SignIn), 0);
    }

    #[tokio::test]
    async fn test_non_admin_signs_in_but_is_denied() {
        let backend = MemoryBackend::new();
        backend.create_user("patient@clinic.in", "patient-pass").unwrap();
        let gate = gate(&backend);
        let session = session();

        let outcome = gate
            .sign_in(&session, "patient@clinic.in", "patient-pass")
            .await
            .unwrap();
        assert!(!outcome.is_admin);

        let snapshot = gate.resolve(&session).await;
        assert!(matches!(decide(snapshot), GateOutcome::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_admin_is_authorized_and_role_is_cached() {
        let backend = MemoryBackend::new();
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let gate = gate(&backend);
        let session = session();

        gate.sign_in(&session, "admin@clinic.in", "admin-pass").await.unwrap();
        backend.reset_calls();

        assert!(matches!(decide(gate.resolve(&session).await), GateOutcome::Authorized(_)));
        assert!(matches!(decide(gate.resolve(&session).await), GateOutcome::Authorized(_)));
        assert_eq!(backend.calls(Operation::Select), 0);
        assert_eq!(backend.calls(Operation::GetUser), 2);
    }

    #[tokio::test]
    async fn test_failed_role_lookup_leaves_session_signed_out() {
        let backend = MemoryBackend::new();
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let gate = gate(&backend);
        let session = session();
        backend.fail(Operation::Select);

        let err = gate.sign_in(&session, "admin@clinic.in", "admin-pass").await.unwrap_err();
        assert!(matches!(err, AuthError::Role(_)));
        assert!(
            session
                .get::<SessionIdentity>(session_keys::IDENTITY)
                .await
                .unwrap()
                .is_none()
        );

        backend.heal(Operation::Select);
        assert!(matches!(decide(gate.resolve(&session).await), GateOutcome::RedirectToLogin));
    }

    #[tokio::test]
    async fn test_transient_failure_is_loading() {
        let backend = MemoryBackend::new();
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let gate = gate(&backend);
        let session = session();
        gate.sign_in(&session, "admin@clinic.in", "admin-pass").await.unwrap();

        backend.fail(Operation::GetUser);
        assert!(matches!(decide(gate.resolve(&session).await), GateOutcome::Loading));

        backend.heal(Operation::GetUser);
        assert!(matches!(decide(gate.resolve(&session).await), GateOutcome::Authorized(_)));
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let backend = MemoryBackend::new();
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let gate = gate(&backend);
        let session = session();
        let outcome = gate
            .sign_in(&session, "admin@clinic.in", "admin-pass")
            .await
            .unwrap();

        let mut stale = outcome.identity;
        stale.expires_at = Some(0);
        session.insert(session_keys::IDENTITY, &stale).await.unwrap();
        backend.reset_calls();

        let snapshot = gate.resolve(&session).await;
        assert!(matches!(decide(snapshot), GateOutcome::Authorized(_)));
        assert_eq!(backend.calls(Operation::Refresh), 1);

        let stored: SessionIdentity = session.get(session_keys::IDENTITY).await.unwrap().unwrap();
        assert_ne!(stored.access_token, stale.access_token);

        gate.resolve(&session).await;
        assert_eq!(backend.calls(Operation::Refresh), 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_if_remote_fails() {
        let backend = MemoryBackend::new();
        backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        let gate = gate(&backend);
        let session = session();
        gate.sign_in(&session, "admin@clinic.in", "admin-pass").await.unwrap();

        backend.fail(Operation::SignOut);
        gate.sign_out(&session).await;

        assert_eq!(backend.calls(Operation::SignOut), 1);
        assert!(matches!(
            decide(gate.resolve(&session).await),
            GateOutcome::RedirectToLogin
        ));
    }

    #[tokio::test]
    async fn test_sign_up_never_grants_role() {
        let backend = MemoryBackend::new();
        let gate = gate(&backend);

        let outcome = gate.sign_up("new@clinic.in", "new-pass-1").await.unwrap();
        assert!(outcome.session.is_some());
        assert!(backend.rows("user_roles").is_empty());

        let err = gate.sign_up("new@clinic.in", "new-pass-1").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn test_change_email_rejects_same_address() {
        let backend = MemoryBackend::new();
        backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        let gate = gate(&backend);
        let session = session();
        let outcome = gate
            .sign_in(&session, "admin@clinic.in", "admin-pass")
            .await
            .unwrap();

        let err = gate
            .change_email(&outcome.identity, "ADMIN@clinic.in")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SameEmail));

        let user = gate
            .change_email(&outcome.identity, "doctor@clinic.in")
            .await
            .unwrap();
        assert_eq!(user.new_email.as_deref(), Some("doctor@clinic.in"));
    }

    #[tokio::test]
    async fn test_change_password_requires_confirmation() {
        let backend = MemoryBackend::new();
        backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        let gate = gate(&backend);
        let session = session();
        let outcome = gate
            .sign_in(&session, "admin@clinic.in", "admin-pass")
            .await
            .unwrap();

        let err = gate
            .change_password(&outcome.identity, "new-pass-1", "new-pass-2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword(_)));
        assert_eq!(backend.calls(Operation::UpdatePassword), 0);

        gate.change_password(&outcome.identity, "new-pass-1", "new-pass-1")
            .await
            .unwrap();
        assert!(
            backend
                .sign_in_with_password("admin@clinic.in", "new-pass-1")
                .await
                .is_ok()
        );
    }
}
