//! Hosted backend client (Supabase auth + PostgREST).
//!
//! Thin HTTP wrapper over the `/auth/v1` and `/rest/v1` endpoints. The
//! current session lives in memory only. Pure parsing lives in free
//! functions for testability.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde_json::Value;
use tokio::sync::RwLock;

use super::types::{AuthCallback, AuthEvent, AuthResponse, BackendError, BackendUser, Listeners, Session, Subscription};
use super::AuthBackend;
use crate::config::BackendTimeouts;

// =============================================================================
// CLIENT
// =============================================================================

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    listeners: Arc<Listeners>,
}

impl SupabaseClient {
    /// Build a client bound to `base_url` with the anonymous `anon_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: &str, anon_key: &str, timeouts: BackendTimeouts) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session: RwLock::new(None),
            listeners: Listeners::new(),
        })
    }

    /// Return a copy of the current session, if signed in.
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    /// Attach `apikey` and a bearer token. The session token wins over the
    /// anonymous key so row-level security sees the signed-in user.
    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.clone(),
        };
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(builder: RequestBuilder) -> Result<String, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(BackendError::Response { status, body: error_message(&text) });
        }
        Ok(text)
    }

    async fn store_session(&self, session: Option<Session>) {
        let event = if session.is_some() { AuthEvent::SignedIn } else { AuthEvent::SignedOut };
        *self.session.write().await = session.clone();
        self.listeners.emit(event, session.as_ref());
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let builder = self
            .request(Method::POST, self.auth_url("token"))
            .await
            .query(&[("grant_type", "password")])
            .json(&body);
        let text = Self::send(builder).await?;
        let response = parse_auth_response(&text)?;
        if response.session.is_some() {
            self.store_session(response.session.clone()).await;
        }
        Ok(response)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let builder = self
            .request(Method::POST, self.auth_url("signup"))
            .await
            .json(&body);
        let text = Self::send(builder).await?;
        let response = parse_auth_response(&text)?;
        if response.session.is_some() {
            self.store_session(response.session.clone()).await;
        }
        Ok(response)
    }

    async fn get_user(&self) -> Result<Option<BackendUser>, BackendError> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }
        let builder = self.request(Method::GET, self.auth_url("user")).await;
        let text = Self::send(builder).await?;
        let user: BackendUser = serde_json::from_str(&text).map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.session.read().await.is_none() {
            return Ok(());
        }
        let builder = self.request(Method::POST, self.auth_url("logout")).await;
        let result = Self::send(builder).await.map(|_| ());
        // The local session is dropped even when the remote call fails.
        self.store_session(None).await;
        result
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.register(callback)
    }

    async fn select_single(&self, table: &str, column: &str, value: &str) -> Result<Option<Value>, BackendError> {
        let builder = self
            .request(Method::GET, self.rest_url(table))
            .await
            .query(&[("select", "*".to_string()), (column, eq_filter(value))]);
        let text = Self::send(builder).await?;
        single_row(table, parse_rows(&text)?)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        let builder = self
            .request(Method::POST, self.rest_url(table))
            .await
            .header("Prefer", "return=representation")
            .json(&row);
        let text = Self::send(builder).await?;
        parse_rows(&text)
    }

    async fn update(&self, table: &str, column: &str, value: &str, patch: Value) -> Result<Vec<Value>, BackendError> {
        let builder = self
            .request(Method::PATCH, self.rest_url(table))
            .await
            .query(&[(column, eq_filter(value))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let text = Self::send(builder).await?;
        parse_rows(&text)
    }

    async fn delete(&self, table: &str, column: &str, value: &str) -> Result<(), BackendError> {
        let builder = self
            .request(Method::DELETE, self.rest_url(table))
            .await
            .query(&[(column, eq_filter(value))]);
        Self::send(builder).await.map(|_| ())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Token endpoint body. Sign-up returns either this shape or a bare user
/// when email confirmation is pending.
#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: BackendUser,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

fn parse_auth_response(json: &str) -> Result<AuthResponse, BackendError> {
    let value: Value = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;

    if value.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(value).map_err(|e| BackendError::Parse(e.to_string()))?;
        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            user: token.user.clone(),
        };
        return Ok(AuthResponse { user: Some(token.user), session: Some(session) });
    }

    if value.get("id").is_some() {
        let user: BackendUser = serde_json::from_value(value).map_err(|e| BackendError::Parse(e.to_string()))?;
        return Ok(AuthResponse { user: Some(user), session: None });
    }

    Ok(AuthResponse::default())
}

fn parse_rows(json: &str) -> Result<Vec<Value>, BackendError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

fn single_row(table: &str, mut rows: Vec<Value>) -> Result<Option<Value>, BackendError> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(BackendError::MultipleRows { table: table.to_string(), count }),
    }
}

/// Pull the human-readable message out of an error body, falling back to
/// the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.error_description.or(e.msg).or(e.message))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
#[path = "supabase_test.rs"]
mod tests;
