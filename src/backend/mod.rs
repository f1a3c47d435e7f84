//! Backend: the hosted auth + row-store surface the app consumes.
//!
//! DESIGN
//! ======
//! [`AuthBackend`] is the seam between the state layer and the hosted
//! service. Two implementations exist: [`supabase::SupabaseClient`] talks
//! to the real service over HTTP, and [`mock::MockBackend`] answers with
//! canned data when no credentials are configured. [`connect`] picks one
//! once at startup; callers share the resulting `Arc`.

pub mod mock;
pub mod supabase;
#[cfg(test)]
pub mod test_helpers;
pub mod types;

use std::sync::Arc;

use serde_json::Value;

use crate::config::BackendConfig;
pub use types::{AuthCallback, AuthEvent, AuthResponse, BackendError, BackendUser, Listeners, Session, Subscription};

// =============================================================================
// TRAIT
// =============================================================================

/// Operation surface of the hosted backend.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError>;

    /// Return the user of the current session, if any.
    async fn get_user(&self) -> Result<Option<BackendUser>, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    fn on_auth_state_change(&self, callback: AuthCallback) -> Subscription;

    /// Select the single row of `table` where `column` equals `value`.
    async fn select_single(&self, table: &str, column: &str, value: &str) -> Result<Option<Value>, BackendError>;

    async fn insert(&self, table: &str, row: Value) -> Result<Vec<Value>, BackendError>;

    async fn update(&self, table: &str, column: &str, value: &str, patch: Value) -> Result<Vec<Value>, BackendError>;

    async fn delete(&self, table: &str, column: &str, value: &str) -> Result<(), BackendError>;
}

// =============================================================================
// SELECTION
// =============================================================================

/// Pick the backend client for this process.
///
/// A configured backend whose HTTP client cannot be built degrades to the
/// mock client rather than failing startup.
#[must_use]
pub fn connect(config: &BackendConfig) -> Arc<dyn AuthBackend> {
    let Some((url, key)) = config.credentials() else {
        tracing::info!("backend not configured, using mock client");
        return Arc::new(mock::MockBackend::new());
    };

    match supabase::SupabaseClient::new(url, key, config.timeouts) {
        Ok(client) => {
            tracing::info!(%url, "backend client initialized");
            Arc::new(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, "backend client build failed, using mock client");
            Arc::new(mock::MockBackend::new())
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
