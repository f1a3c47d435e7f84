//! Mock backend used when no credentials are configured.
//!
//! Every operation succeeds immediately with canned data keyed by
//! [`MOCK_USER_ID`].

use std::sync::Arc;

use serde_json::{Value, json};

use super::types::{AuthCallback, AuthEvent, AuthResponse, BackendError, BackendUser, Listeners, Session, Subscription};
use super::AuthBackend;
use crate::profile::PROFILES_TABLE;

pub const MOCK_USER_ID: &str = "mock-id";
pub const MOCK_ACCESS_TOKEN: &str = "mock-token";
pub const MOCK_REFRESH_TOKEN: &str = "mock-refresh-token";
pub const MOCK_PROFILE_NAME: &str = "Mock User";
pub const MOCK_PROFILE_EMAIL: &str = "mock@example.com";

pub struct MockBackend {
    listeners: Arc<Listeners>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { listeners: Listeners::new() }
    }

    fn auth_response(email: &str) -> AuthResponse {
        if email.is_empty() {
            return AuthResponse::default();
        }
        let user = BackendUser { id: MOCK_USER_ID.into(), email: Some(email.into()), user_metadata: json!({}) };
        let session = Session {
            access_token: MOCK_ACCESS_TOKEN.into(),
            refresh_token: Some(MOCK_REFRESH_TOKEN.into()),
            expires_in: Some(3600),
            user: user.clone(),
        };
        AuthResponse { user: Some(user), session: Some(session) }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthBackend for MockBackend {
    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<AuthResponse, BackendError> {
        Ok(Self::auth_response(email))
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthResponse, BackendError> {
        Ok(Self::auth_response(email))
    }

    async fn get_user(&self) -> Result<Option<BackendUser>, BackendError> {
        Ok(None)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Registers the callback and fires it once with `SignedOut` right away.
    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        callback(AuthEvent::SignedOut, None);
        self.listeners.register(callback)
    }

    async fn select_single(&self, table: &str, column: &str, value: &str) -> Result<Option<Value>, BackendError> {
        if table == PROFILES_TABLE && column == "id" && value == MOCK_USER_ID {
            return Ok(Some(json!({
                "id": MOCK_USER_ID,
                "name": MOCK_PROFILE_NAME,
                "email": MOCK_PROFILE_EMAIL,
                "avatar_url": null,
            })));
        }
        Ok(None)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        tracing::info!(%table, %row, "mock insert");
        Ok(match row {
            Value::Array(rows) => rows,
            other => vec![other],
        })
    }

    async fn update(&self, _table: &str, _column: &str, _value: &str, patch: Value) -> Result<Vec<Value>, BackendError> {
        Ok(vec![patch])
    }

    async fn delete(&self, _table: &str, _column: &str, _value: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_test.rs"]
mod tests;
