//! In-process backend implementing tables, identity and storage.
//!
//! Mirrors the hosted project's row-level policies:
//!
//! | Table                   | Read                            | Write  |
//! |-------------------------|---------------------------------|--------|
//! | `medicines`             | anyone (active rows only)       | admin  |
//! | `services`              | anyone (enabled rows only)      | admin  |
//! | `website_content`       | anyone                          | admin  |
//! | `doctor_profile`        | anyone                          | admin  |
//! | `admin_settings`        | anyone                          | admin  |
//! | `consultation_requests` | admin                           | admin  |
//! | `medicine_inquiries`    | admin                           | admin  |
//! | `user_roles`            | own rows, or admin              | none   |
//!
//! Admins see every row of the public tables. Role grants happen out of band
//! through [`MemoryBackend::grant_role`].
//!
//! Every call is counted per [`Operation`], and any operation can be made to
//! fail on demand, so tests can assert exact remote call counts and exercise
//! failure paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use siddha_clinic_core::{AppRole, UserId};

use super::{
    AuthSession, AuthUser, Caller, IdentityProvider, ObjectStorage, Query, SignUpOutcome,
    StoreError, TableStore,
};

/// Access token lifetime when not overridden.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Base of public object URLs served by the memory backend.
const PUBLIC_BASE: &str = "http://memory.local/storage/v1/object/public";

/// A countable, failable backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    SelectSingle,
    Count,
    Insert,
    Update,
    Delete,
    SignIn,
    SignUp,
    SignOut,
    GetUser,
    Refresh,
    UpdateEmail,
    UpdatePassword,
    Upload,
}

#[derive(Debug, Clone)]
struct MemoryUser {
    id: UserId,
    email: String,
    password: String,
    pending_email: Option<String>,
}

impl MemoryUser {
    fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: Some(self.email.clone()),
            new_email: self.pending_email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    size: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    users: Vec<MemoryUser>,
    /// access token -> (user, unix expiry)
    access_tokens: HashMap<String, (UserId, i64)>,
    /// refresh token -> user
    refresh_tokens: HashMap<String, UserId>,
    objects: HashMap<(String, String), StoredObject>,
    calls: HashMap<Operation, usize>,
    /// Operation -> successes remaining before every further call fails.
    failures: HashMap<Operation, usize>,
    token_ttl_secs: i64,
}

/// Tables anyone may read.
const PUBLIC_READ: &[&str] = &[
    "medicines",
    "services",
    "website_content",
    "doctor_profile",
    "admin_settings",
];

/// In-memory stand-in for a Supabase project.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
                ..MemoryState::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory backend lock poisoned".to_string()))
    }

    // -------------------------------------------------------------------------
    // Out-of-band administration (what the service role key does remotely)
    // -------------------------------------------------------------------------

    /// Register a confirmed identity directly, bypassing sign-up.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the email is already registered.
    pub fn create_user(&self, email: &str, password: &str) -> Result<UserId, StoreError> {
        let mut state = self.lock()?;
        state.create_user(email, password)
    }

    /// Grant a role to a user.
    ///
    /// # Errors
    ///
    /// Fails only if the backend lock is poisoned.
    pub fn grant_role(&self, user_id: UserId, role: AppRole) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let row = json!({ "user_id": user_id, "role": role.to_string() });
        state.insert_row("user_roles", row);
        Ok(())
    }

    /// Insert a row as the service role (no policy checks).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] if the row is not a JSON object.
    pub fn seed(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        if !row.is_object() {
            return Err(StoreError::Decode("row must be a JSON object".to_string()));
        }
        let mut state = self.lock()?;
        Ok(state.insert_row(table, row))
    }

    /// Every row of a table in insertion order, ignoring policies.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .map(|state| state.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Number of stored objects in a bucket.
    #[must_use]
    pub fn object_count(&self, bucket: &str) -> usize {
        self.lock()
            .map(|state| state.objects.keys().filter(|(b, _)| b == bucket).count())
            .unwrap_or_default()
    }

    /// Content type and size of a stored object.
    #[must_use]
    pub fn object_info(&self, bucket: &str, key: &str) -> Option<(String, usize)> {
        let state = self.lock().ok()?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| (o.content_type.clone(), o.size))
    }

    // -------------------------------------------------------------------------
    // Test instrumentation
    // -------------------------------------------------------------------------

    /// How many times an operation has been invoked (including failures).
    #[must_use]
    pub fn calls(&self, op: Operation) -> usize {
        self.lock()
            .map(|state| state.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Reset all call counters.
    pub fn reset_calls(&self) {
        if let Ok(mut state) = self.lock() {
            state.calls.clear();
        }
    }

    /// Make every subsequent call of `op` fail with [`StoreError::Unavailable`].
    pub fn fail(&self, op: Operation) {
        self.fail_after(op, 0);
    }

    /// Let `successes` more calls of `op` succeed, then fail every later one.
    pub fn fail_after(&self, op: Operation, successes: usize) {
        if let Ok(mut state) = self.lock() {
            state.failures.insert(op, successes);
        }
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: Operation) {
        if let Ok(mut state) = self.lock() {
            state.failures.remove(&op);
        }
    }

    /// Override the access token lifetime for tokens issued from now on.
    pub fn set_token_ttl_secs(&self, secs: i64) {
        if let Ok(mut state) = self.lock() {
            state.token_ttl_secs = secs;
        }
    }
}

impl MemoryState {
    /// Count the call and apply any injected failure.
    fn enter(&mut self, op: Operation) -> Result<(), StoreError> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get_mut(&op) {
            Some(0) => Err(StoreError::Unavailable(format!("injected {op:?} failure"))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn create_user(&mut self, email: &str, password: &str) -> Result<UserId, StoreError> {
        if self
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(StoreError::Rejected("User already registered".to_string()));
        }
        let id = UserId::random();
        self.users.push(MemoryUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
            pending_email: None,
        });
        Ok(id)
    }

    fn issue_session(&mut self, user: &MemoryUser) -> AuthSession {
        let access_token = format!("mem-at-{}", Uuid::new_v4().simple());
        let refresh_token = format!("mem-rt-{}", Uuid::new_v4().simple());
        let expires_at = Utc::now().timestamp() + self.token_ttl_secs;
        self.access_tokens
            .insert(access_token.clone(), (user.id, expires_at));
        self.refresh_tokens.insert(refresh_token.clone(), user.id);
        AuthSession {
            access_token,
            refresh_token,
            expires_at: Some(expires_at),
            user: user.to_auth_user(),
        }
    }

    /// Resolve an access token to a live user id.
    fn user_for_token(&self, token: &str) -> Result<UserId, StoreError> {
        let (user_id, expires_at) = self
            .access_tokens
            .get(token)
            .copied()
            .ok_or(StoreError::Unauthorized)?;
        if expires_at <= Utc::now().timestamp() {
            return Err(StoreError::Unauthorized);
        }
        Ok(user_id)
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut MemoryUser, StoreError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::Unauthorized)
    }

    /// Resolve the caller to a user id; anonymous callers resolve to `None`.
    fn caller_user(&self, caller: &Caller) -> Result<Option<UserId>, StoreError> {
        caller.token().map(|t| self.user_for_token(t)).transpose()
    }

    fn is_admin(&self, user: Option<UserId>) -> bool {
        let Some(user) = user else {
            return false;
        };
        let user = Value::String(user.to_string());
        self.tables.get("user_roles").is_some_and(|rows| {
            rows.iter()
                .any(|r| r.get("user_id") == Some(&user) && r["role"] == "admin")
        })
    }

    /// Rows of `table` the caller is allowed to see, in insertion order.
    fn visible_rows(&self, caller: &Caller, table: &str) -> Result<Vec<Value>, StoreError> {
        let user = self.caller_user(caller)?;
        let admin = self.is_admin(user);
        let rows = self.tables.get(table).cloned().unwrap_or_default();

        if admin {
            return Ok(rows);
        }

        let visible = match table {
            "medicines" => rows
                .into_iter()
                .filter(|r| r["is_active"] == Value::Bool(true))
                .collect(),
            "services" => rows
                .into_iter()
                .filter(|r| r["is_enabled"] == Value::Bool(true))
                .collect(),
            "user_roles" => {
                let own = user.map(|u| Value::String(u.to_string()));
                rows.into_iter()
                    .filter(|r| own.is_some() && r.get("user_id") == own.as_ref())
                    .collect()
            }
            t if PUBLIC_READ.contains(&t) => rows,
            _ => Vec::new(),
        };
        Ok(visible)
    }

    fn require_write(&self, caller: &Caller, table: &str) -> Result<(), StoreError> {
        let user = self.caller_user(caller)?;
        if table != "user_roles" && self.is_admin(user) {
            return Ok(());
        }
        if user.is_none() {
            return Err(StoreError::Unauthorized);
        }
        Err(StoreError::Forbidden(format!(
            "new row violates row-level security policy for table \"{table}\""
        )))
    }

    /// Insert with server-generated `id` and `created_at`.
    fn insert_row(&mut self, table: &str, row: Value) -> Value {
        let mut object = match row {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        object.entry("created_at").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        });
        let row = Value::Object(object);
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    fn find_index(&self, table: &str, id: Uuid) -> Option<usize> {
        let id = Value::String(id.to_string());
        self.tables
            .get(table)?
            .iter()
            .position(|r| r.get("id") == Some(&id))
    }
}

#[async_trait]
impl TableStore for MemoryBackend {
    async fn select(
        &self,
        caller: &Caller,
        table: &str,
        query: &Query,
    ) -> Result<Vec<Value>, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Select)?;
        let rows = state.visible_rows(caller, table)?;
        Ok(query.apply(&rows))
    }

    async fn select_maybe_single(
        &self,
        caller: &Caller,
        table: &str,
        query: &Query,
    ) -> Result<Option<Value>, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::SelectSingle)?;
        let rows = state.visible_rows(caller, table)?;
        Ok(query.clone().limit(1).apply(&rows).into_iter().next())
    }

    async fn count(&self, caller: &Caller, table: &str, query: &Query) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Count)?;
        let rows = state.visible_rows(caller, table)?;
        Ok(rows.iter().filter(|r| query.matches(r)).count() as u64)
    }

    async fn insert(&self, caller: &Caller, table: &str, row: &Value) -> Result<Value, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Insert)?;
        state.require_write(caller, table)?;
        if !row.is_object() {
            return Err(StoreError::Rejected("row must be a JSON object".to_string()));
        }
        Ok(state.insert_row(table, row.clone()))
    }

    async fn update(
        &self,
        caller: &Caller,
        table: &str,
        id: Uuid,
        patch: &Value,
    ) -> Result<Value, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Update)?;
        state.require_write(caller, table)?;
        let Value::Object(fields) = patch else {
            return Err(StoreError::Rejected("patch must be a JSON object".to_string()));
        };
        let index = state.find_index(table, id).ok_or(StoreError::NotFound)?;
        let row = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(index))
            .and_then(Value::as_object_mut)
            .ok_or(StoreError::NotFound)?;
        for (key, value) in fields {
            if key != "id" && key != "created_at" {
                row.insert(key.clone(), value.clone());
            }
        }
        Ok(Value::Object(row.clone()))
    }

    async fn delete(&self, caller: &Caller, table: &str, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Delete)?;
        state.require_write(caller, table)?;
        let index = state.find_index(table, id).ok_or(StoreError::NotFound)?;
        if let Some(rows) = state.tables.get_mut(table) {
            rows.remove(index);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::SignIn)?;
        let user = state
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
            .cloned()
            .ok_or_else(|| StoreError::Rejected("Invalid login credentials".to_string()))?;
        Ok(state.issue_session(&user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::SignUp)?;
        let id = state.create_user(email, password)?;
        let user = state.user_mut(id)?.clone();
        let session = state.issue_session(&user);
        Ok(SignUpOutcome {
            user: user.to_auth_user(),
            session: Some(session),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::SignOut)?;
        let (user, _) = state
            .access_tokens
            .remove(access_token)
            .ok_or(StoreError::Unauthorized)?;
        state.refresh_tokens.retain(|_, owner| *owner != user);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::GetUser)?;
        let id = state.user_for_token(access_token)?;
        Ok(state.user_mut(id)?.to_auth_user())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Refresh)?;
        let id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(StoreError::Unauthorized)?;
        let user = state.user_mut(id)?.clone();
        Ok(state.issue_session(&user))
    }

    async fn update_email(
        &self,
        access_token: &str,
        new_email: &str,
    ) -> Result<AuthUser, StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::UpdateEmail)?;
        let id = state.user_for_token(access_token)?;
        if state
            .users
            .iter()
            .any(|u| u.id != id && u.email.eq_ignore_ascii_case(new_email))
        {
            return Err(StoreError::Rejected(
                "A user with this email address has already been registered".to_string(),
            ));
        }
        let user = state.user_mut(id)?;
        user.pending_email = Some(new_email.to_string());
        Ok(user.to_auth_user())
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::UpdatePassword)?;
        let id = state.user_for_token(access_token)?;
        state.user_mut(id)?.password = new_password.to_string();
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(
        &self,
        caller: &Caller,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.enter(Operation::Upload)?;
        let user = state
            .caller_user(caller)?
            .ok_or(StoreError::Unauthorized)?;
        if !state.is_admin(Some(user)) {
            return Err(StoreError::Forbidden(
                "new row violates row-level security policy".to_string(),
            ));
        }
        let object_key = (bucket.to_string(), key.to_string());
        if state.objects.contains_key(&object_key) {
            return Err(StoreError::Conflict("The resource already exists".to_string()));
        }
        state.objects.insert(
            object_key,
            StoredObject {
                content_type: content_type.to_string(),
                size: bytes.len(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{PUBLIC_BASE}/{bucket}/{key}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn admin(backend: &MemoryBackend) -> Caller {
        let id = backend.create_user("admin@clinic.in", "admin-pass").unwrap();
        backend.grant_role(id, AppRole::Admin).unwrap();
        let session = backend
            .sign_in_with_password("admin@clinic.in", "admin-pass")
            .await
            .unwrap();
        Caller::user(&session.access_token)
    }

    #[tokio::test]
    async fn test_insert_generates_id_and_timestamp() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let row = backend
            .insert(&caller, "medicines", &json!({"name": "Nilavembu"}))
            .await
            .unwrap();
        assert!(row["id"].as_str().is_some());
        assert!(row["created_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_anonymous_cannot_write() {
        let backend = MemoryBackend::new();
        let err = backend
            .insert(&Caller::Anonymous, "medicines", &json!({"name": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden() {
        let backend = MemoryBackend::new();
        backend.create_user("patient@clinic.in", "patient-pass").unwrap();
        let session = backend
            .sign_in_with_password("patient@clinic.in", "patient-pass")
            .await
            .unwrap();
        let caller = Caller::user(&session.access_token);
        let err = backend
            .insert(&caller, "services", &json!({"title": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        let consultations = backend
            .select(&caller, "consultation_requests", &Query::new())
            .await
            .unwrap();
        assert!(consultations.is_empty());
    }

    #[tokio::test]
    async fn test_public_reads_only_active_medicines() {
        let backend = MemoryBackend::new();
        backend
            .seed("medicines", json!({"name": "Pain Relief Tonic", "is_active": true}))
            .unwrap();
        backend
            .seed("medicines", json!({"name": "Cough Syrup", "is_active": false}))
            .unwrap();

        let public = backend
            .select(&Caller::Anonymous, "medicines", &Query::new())
            .await
            .unwrap();
        assert_eq!(public.len(), 1);

        let caller = admin(&backend).await;
        let all = backend
            .select(&caller, "medicines", &Query::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_user_reads_own_roles_only() {
        let backend = MemoryBackend::new();
        let other = backend.create_user("other@clinic.in", "other-pass").unwrap();
        backend.grant_role(other, AppRole::Admin).unwrap();
        let me = backend.create_user("me@clinic.in", "me-pass-1").unwrap();
        backend.grant_role(me, AppRole::User).unwrap();
        let session = backend
            .sign_in_with_password("me@clinic.in", "me-pass-1")
            .await
            .unwrap();

        let rows = backend
            .select(
                &Caller::user(&session.access_token),
                "user_roles",
                &Query::new(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["role"], "user");
    }

    #[tokio::test]
    async fn test_update_patches_fields_and_keeps_id() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let row = backend
            .insert(&caller, "services", &json!({"title": "Pulse", "sort_order": 1}))
            .await
            .unwrap();
        let id: Uuid = row["id"].as_str().unwrap().parse().unwrap();

        let updated = backend
            .update(&caller, "services", id, &json!({"title": "Naadi", "id": "hijack"}))
            .await
            .unwrap();
        assert_eq!(updated["title"], "Naadi");
        assert_eq!(updated["sort_order"], 1);
        assert_eq!(updated["id"], row["id"]);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let backend = MemoryBackend::new();
        let caller = admin(&backend).await;
        let err = backend
            .update(&caller, "services", Uuid::new_v4(), &json!({"title": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_failure_injection_and_counters() {
        let backend = MemoryBackend::new();
        backend.fail_after(Operation::Select, 1);

        assert!(
            backend
                .select(&Caller::Anonymous, "services", &Query::new())
                .await
                .is_ok()
        );
        let err = backend
            .select(&Caller::Anonymous, "services", &Query::new())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(backend.calls(Operation::Select), 2);

        backend.heal(Operation::Select);
        assert!(
            backend
                .select(&Caller::Anonymous, "services", &Query::new())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized_until_refreshed() {
        let backend = MemoryBackend::new();
        backend.create_user("dr@clinic.in", "dr-pass-1").unwrap();
        backend.set_token_ttl_secs(-1);
        let session = backend
            .sign_in_with_password("dr@clinic.in", "dr-pass-1")
            .await
            .unwrap();

        let err = backend.get_user(&session.access_token).await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));

        backend.set_token_ttl_secs(3600);
        let fresh = backend.refresh(&session.refresh_token).await.unwrap();
        assert!(backend.get_user(&fresh.access_token).await.is_ok());
        // Refresh tokens rotate.
        assert!(backend.refresh(&session.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_password() {
        let backend = MemoryBackend::new();
        backend.create_user("dr@clinic.in", "dr-pass-1").unwrap();
        let err = backend
            .sign_in_with_password("dr@clinic.in", "wrong-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_update_email_is_pending() {
        let backend = MemoryBackend::new();
        backend.create_user("dr@clinic.in", "dr-pass-1").unwrap();
        let session = backend
            .sign_in_with_password("dr@clinic.in", "dr-pass-1")
            .await
            .unwrap();
        let user = backend
            .update_email(&session.access_token, "new@clinic.in")
            .await
            .unwrap();
        assert_eq!(user.email.as_deref(), Some("dr@clinic.in"));
        assert_eq!(user.new_email.as_deref(), Some("new@clinic.in"));
    }

    #[tokio::test]
    async fn test_upload_requires_admin_and_unique_key() {
        let backend = MemoryBackend::new();
        let err = backend
            .upload(&Caller::Anonymous, "admin-uploads", "a.png", vec![1], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized));

        let caller = admin(&backend).await;
        backend
            .upload(&caller, "admin-uploads", "a.png", vec![1, 2], "image/png")
            .await
            .unwrap();
        assert_eq!(
            backend.object_info("admin-uploads", "a.png"),
            Some(("image/png".to_string(), 2))
        );
        let dup = backend
            .upload(&caller, "admin-uploads", "a.png", vec![1], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(dup, StoreError::Conflict(_)));
    }
}
