//! Scripted backend for unit tests. Each operation can be told to fail and
//! every call is recorded by name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::types::{AuthCallback, AuthEvent, AuthResponse, BackendError, BackendUser, Listeners, Session, Subscription};
use super::AuthBackend;

pub const SCRIPTED_USER_ID: &str = "u-1";

#[derive(Default)]
pub struct ScriptedBackend {
    pub fail_sign_in: bool,
    pub fail_sign_up: bool,
    pub fail_sign_out: bool,
    pub fail_get_user: bool,
    pub fail_select: bool,
    pub fail_insert: bool,
    pub fail_update: bool,
    /// Sign-in and sign-up succeed but carry no user.
    pub no_user: bool,
    /// Returned by `get_user`.
    pub current_user: Option<BackendUser>,
    /// `get_user` emits a `SignedIn` event before it answers.
    pub sign_in_during_get_user: bool,
    pub profiles: Mutex<HashMap<String, Value>>,
    pub calls: Mutex<Vec<String>>,
    pub listeners: Arc<Listeners>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_profile(self, id: &str, name: &str, avatar_url: Option<&str>) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(id.to_string(), json!({ "id": id, "name": name, "avatar_url": avatar_url }));
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn signed_in(email: &str) -> AuthResponse {
        let user = BackendUser { id: SCRIPTED_USER_ID.into(), email: Some(email.into()), user_metadata: json!({}) };
        let session = Session { access_token: "t".into(), refresh_token: None, expires_in: None, user: user.clone() };
        AuthResponse { user: Some(user), session: Some(session) }
    }
}

pub fn rejected(op: &str) -> BackendError {
    BackendError::Response { status: 400, body: format!("{op} rejected") }
}

#[async_trait::async_trait]
impl AuthBackend for ScriptedBackend {
    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<AuthResponse, BackendError> {
        self.record("sign_in");
        if self.fail_sign_in {
            return Err(rejected("sign_in"));
        }
        if self.no_user {
            return Ok(AuthResponse::default());
        }
        let resp = Self::signed_in(email);
        self.listeners.emit(AuthEvent::SignedIn, resp.session.as_ref());
        Ok(resp)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthResponse, BackendError> {
        self.record("sign_up");
        if self.fail_sign_up {
            return Err(rejected("sign_up"));
        }
        if self.no_user {
            return Ok(AuthResponse::default());
        }
        Ok(Self::signed_in(email))
    }

    async fn get_user(&self) -> Result<Option<BackendUser>, BackendError> {
        self.record("get_user");
        if self.fail_get_user {
            return Err(BackendError::Request("connection refused".into()));
        }
        if self.sign_in_during_get_user {
            let resp = Self::signed_in("late@example.com");
            self.listeners.emit(AuthEvent::SignedIn, resp.session.as_ref());
        }
        Ok(self.current_user.clone())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record("sign_out");
        self.listeners.emit(AuthEvent::SignedOut, None);
        if self.fail_sign_out {
            return Err(rejected("sign_out"));
        }
        Ok(())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription {
        self.listeners.register(callback)
    }

    async fn select_single(&self, _table: &str, _column: &str, value: &str) -> Result<Option<Value>, BackendError> {
        self.record("select");
        if self.fail_select {
            return Err(rejected("select"));
        }
        Ok(self.profiles.lock().unwrap().get(value).cloned())
    }

    async fn insert(&self, _table: &str, row: Value) -> Result<Vec<Value>, BackendError> {
        self.record("insert");
        if self.fail_insert {
            return Err(rejected("insert"));
        }
        if let Some(id) = row.get("id").and_then(Value::as_str) {
            self.profiles.lock().unwrap().insert(id.to_string(), row.clone());
        }
        Ok(vec![row])
    }

    async fn update(&self, _table: &str, _column: &str, value: &str, patch: Value) -> Result<Vec<Value>, BackendError> {
        self.record("update");
        if self.fail_update {
            return Err(rejected("update"));
        }
        let mut profiles = self.profiles.lock().unwrap();
        let Some(row) = profiles.get_mut(value) else {
            return Ok(vec![]);
        };
        if let (Some(row), Some(patch)) = (row.as_object_mut(), patch.as_object()) {
            for (k, v) in patch {
                row.insert(k.clone(), v.clone());
            }
        }
        Ok(vec![row.clone()])
    }

    async fn delete(&self, _table: &str, _column: &str, value: &str) -> Result<(), BackendError> {
        self.record("delete");
        self.profiles.lock().unwrap().remove(value);
        Ok(())
    }
}
