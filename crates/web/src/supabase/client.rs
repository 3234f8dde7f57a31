//! HTTPS client for a hosted Supabase project.
//!
//! # API Reference
//!
//! - Tables: `{project}/rest/v1/{table}` (`PostgREST`)
//! - Identity: `{project}/auth/v1/*` (`GoTrue`)
//! - Storage: `{project}/storage/v1/object/{bucket}/{key}`
//! - Authentication: `apikey: <key>` plus `Authorization: Bearer <user token or key>`

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::{
    AuthSession, AuthUser, Caller, IdentityProvider, ObjectStorage, Query, SignUpOutcome,
    StoreError, TableStore,
};

/// `PostgREST` media type that returns a single object instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Supabase API client.
///
/// Cheap to clone. The key it is built with is the anon key for the web
/// binary, or the service role key for the CLI.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

/// Error body shapes returned by `PostgREST`, `GoTrue` and Storage.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

impl SupabaseClient {
    /// Create a new client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(mut base_url: Url, api_key: SecretString) -> Result<Self, StoreError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| StoreError::Decode(format!("Invalid API key format: {e}")))?;
        key.set_sensitive(true);
        headers.insert("apikey", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("siddha-clinic/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                base_url,
                api_key,
            }),
        })
    }

    /// Build an absolute URL below the project root.
    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| StoreError::Decode(format!("Invalid endpoint {path}: {e}")))
    }

    /// Start a request carrying the caller's bearer token, or the client key
    /// when anonymous.
    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or_else(|| self.inner.api_key.expose_secret());
        self.inner
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    /// Parse a JSON success body or convert the response into a `StoreError`.
    async fn handle_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| StoreError::Decode(format!("Failed to parse response: {e}")));
        }
        Err(Self::parse_error(response).await)
    }

    /// Map a non-success response to a `StoreError`.
    async fn parse_error(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or(body);

        match status {
            StatusCode::UNAUTHORIZED => StoreError::Unauthorized,
            StatusCode::FORBIDDEN => StoreError::Forbidden(message),
            StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => StoreError::NotFound,
            StatusCode::CONFLICT => StoreError::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::Rejected(message)
            }
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                StoreError::Unavailable(message)
            }
            _ => StoreError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Parse the total from a `Content-Range` header such as `0-24/118` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.parse().ok()
}

#[async_trait]
impl TableStore for SupabaseClient {
    #[instrument(skip_all, fields(table = %table))]
    async fn select(
        &self,
        caller: &Caller,
        table: &str,
        query: &Query,
    ) -> Result<Vec<Value>, StoreError> {
        let response = self
            .request(Method::GET, self.table_url(table)?, caller.token())
            .query(&query.to_params())
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn select_maybe_single(
        &self,
        caller: &Caller,
        table: &str,
        query: &Query,
    ) -> Result<Option<Value>, StoreError> {
        let query = query.clone().limit(1);
        let response = self
            .request(Method::GET, self.table_url(table)?, caller.token())
            .query(&query.to_params())
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;

        // PostgREST answers 406 when the singular result has zero rows.
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Ok(None);
        }
        Self::handle_json(response).await.map(Some)
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn count(&self, caller: &Caller, table: &str, query: &Query) -> Result<u64, StoreError> {
        let response = self
            .request(Method::HEAD, self.table_url(table)?, caller.token())
            .query(&query.to_params())
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| StoreError::Decode("missing Content-Range total".to_string()))
    }

    #[instrument(skip_all, fields(table = %table))]
    async fn insert(&self, caller: &Caller, table: &str, row: &Value) -> Result<Value, StoreError> {
        let response = self
            .request(Method::POST, self.table_url(table)?, caller.token())
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn update(
        &self,
        caller: &Caller,
        table: &str,
        id: Uuid,
        patch: &Value,
    ) -> Result<Value, StoreError> {
        let response = self
            .request(Method::PATCH, self.table_url(table)?, caller.token())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(patch)
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip_all, fields(table = %table, id = %id))]
    async fn delete(&self, caller: &Caller, table: &str, id: Uuid) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, self.table_url(table)?, caller.token())
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;

        // Row-level security hides rows rather than failing, so an empty
        // representation means nothing was deleted.
        let deleted: Vec<Value> = Self::handle_json(response).await?;
        if deleted.is_empty() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, StoreError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let response = self
            .request(Method::POST, url, None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, StoreError> {
        let response = self
            .request(Method::POST, self.endpoint("auth/v1/signup")?, None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: Value = Self::handle_json(response).await?;

        // Auto-confirming projects return a session; otherwise the bare user.
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)
                .map_err(|e| StoreError::Decode(format!("Invalid session: {e}")))?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user: AuthUser = serde_json::from_value(body)
            .map_err(|e| StoreError::Decode(format!("Invalid user: {e}")))?;
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        let response = self
            .request(
                Method::POST,
                self.endpoint("auth/v1/logout")?,
                Some(access_token),
            )
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, StoreError> {
        let response = self
            .request(Method::GET, self.endpoint("auth/v1/user")?, Some(access_token))
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, StoreError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");
        let response = self
            .request(Method::POST, url, None)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip(self, access_token))]
    async fn update_email(
        &self,
        access_token: &str,
        new_email: &str,
    ) -> Result<AuthUser, StoreError> {
        let response = self
            .request(Method::PUT, self.endpoint("auth/v1/user")?, Some(access_token))
            .json(&json!({ "email": new_email }))
            .send()
            .await?;
        Self::handle_json(response).await
    }

    #[instrument(skip_all)]
    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::PUT, self.endpoint("auth/v1/user")?, Some(access_token))
            .json(&json!({ "password": new_password }))
            .send()
            .await?;
        let _user: AuthUser = Self::handle_json(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseClient {
    #[instrument(skip_all, fields(bucket = %bucket, key = %key, size = bytes.len()))]
    async fn upload(
        &self,
        caller: &Caller,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{key}"))?;
        let response = self
            .request(Method::POST, url, caller.token())
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        format!("{base}/storage/v1/object/public/{bucket}/{key}")
    }
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(
            Url::parse("https://abcd.supabase.co/").unwrap(),
            SecretString::from("anon-key"),
        )
        .unwrap()
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/118"), Some(118));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            client().public_url("admin-uploads", "medicines/1700000000000-abc1234.png"),
            "https://abcd.supabase.co/storage/v1/object/public/admin-uploads/medicines/1700000000000-abc1234.png"
        );
    }

    #[test]
    fn test_endpoints() {
        let client = client();
        assert_eq!(
            client.table_url("medicines").unwrap().as_str(),
            "https://abcd.supabase.co/rest/v1/medicines"
        );
        assert_eq!(
            client.endpoint("auth/v1/user").unwrap().as_str(),
            "https://abcd.supabase.co/auth/v1/user"
        );
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(
            body.into_message().as_deref(),
            Some("Invalid login credentials")
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", client());
        assert!(debug.contains("abcd.supabase.co"));
        assert!(!debug.contains("anon-key"));
    }
}
