//! Backend types: users, sessions, auth events, and errors.
//!
//! Shared by the hosted client and the mock client so the store never
//! depends on which one it was handed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend client operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request to the backend failed before a response arrived.
    #[error("backend request failed: {0}")]
    Request(String),

    /// The backend returned a non-success HTTP status.
    #[error("backend response error: status {status}: {body}")]
    Response { status: u16, body: String },

    /// The backend response body could not be deserialized.
    #[error("backend response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A single-row select matched more than one row.
    #[error("expected a single row from {table}, got {count}")]
    MultipleRows { table: String, count: usize },

    /// A filtered update matched no row.
    #[error("no row in {table} matched the update")]
    NoRowsMatched { table: String },
}

impl BackendError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_BACKEND_REQUEST",
            Self::Response { .. } => "E_BACKEND_RESPONSE",
            Self::Parse(_) => "E_BACKEND_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::MultipleRows { .. } => "E_MULTIPLE_ROWS",
            Self::NoRowsMatched { .. } => "E_NO_ROWS_MATCHED",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// USERS AND SESSIONS
// =============================================================================

/// Authentication record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: BackendUser,
}

/// Result of a sign-in or sign-up call. Sign-up may produce a user without
/// a session when the backend requires email confirmation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthResponse {
    pub user: Option<BackendUser>,
    pub session: Option<Session>,
}

// =============================================================================
// AUTH EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

pub type AuthCallback = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

/// Registry of auth-state listeners shared by a client and its subscriptions.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, AuthCallback>>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a callback. The returned subscription removes it on drop.
    pub fn register(self: &Arc<Self>, callback: AuthCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.insert(id, callback);
        }
        Subscription { id, listeners: Arc::downgrade(self) }
    }

    /// Invoke every registered callback. Callbacks run outside the lock so
    /// they may register or drop subscriptions themselves.
    pub fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        let snapshot: Vec<AuthCallback> = match self.callbacks.lock() {
            Ok(callbacks) => callbacks.values().cloned().collect(),
            Err(_) => return,
        };
        tracing::debug!(?event, listeners = snapshot.len(), "auth state change");
        for callback in snapshot {
            callback(event, session);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.lock().map(|c| c.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.remove(&id);
        }
    }
}

/// Handle for an auth-state listener.
#[must_use = "dropping a subscription unsubscribes it"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
