//! User store: the auth state container behind the login, register and
//! profile screens.
//!
//! DESIGN
//! ======
//! `UserStore` is an explicitly constructed instance, not a global. State
//! is published through a `watch` channel so views can read a snapshot or
//! await changes. Each async action holds the store's operation lock for
//! its whole duration, so actions on one instance run one at a time and
//! `is_loading` always belongs to exactly one action.
//!
//! Failures come in two tiers. Primary failures (sign-in, sign-up,
//! sign-out, profile edits) land in `last_error` and are returned to the
//! caller. Enrichment failures (profile fetch or insert) produce an
//! [`Enrichment::Degraded`] value: they are logged and the action
//! continues with a derived fallback. `initialize` only logs.
//!
//! Without backend credentials the store runs in simulated mode: actions
//! succeed locally after a fixed delay and never touch the backend.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::backend::{AuthBackend, AuthResponse, BackendError, BackendUser};
use crate::config::BackendConfig;
use crate::profile::{self, ProfilePatch, name_from_email};

/// User id assigned by simulated sign-in and sign-up.
pub const SIMULATED_USER_ID: &str = "1";

// =============================================================================
// STATE
// =============================================================================

/// Current user as shown by the app. All fields are `None` when signed out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(id: &str, name: &str, email: &str, avatar: Option<String>) -> Self {
        Self { id: Some(id.to_owned()), name: Some(name.to_owned()), email: Some(email.to_owned()), avatar }
    }

    /// Profile for a signed-in user with no profile row: name from the
    /// email's local part, no avatar.
    #[must_use]
    pub fn derived(id: &str, email: &str) -> Self {
        Self::new(id, &name_from_email(email), email, None)
    }
}

/// Error value stored in [`AuthState::last_error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "code", content = "message")]
pub enum StoreError {
    #[error("sign in failed: {0}")]
    SignIn(String),
    #[error("sign up failed: {0}")]
    SignUp(String),
    #[error("sign out failed: {0}")]
    SignOut(String),
    #[error("backend returned no user")]
    NoUser,
    #[error("profile unavailable: {0}")]
    Profile(String),
    #[error("profile update failed: {0}")]
    ProfileUpdate(String),
    #[error("not signed in")]
    NotSignedIn,
}

impl StoreError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SignIn(_) => "E_SIGN_IN",
            Self::SignUp(_) => "E_SIGN_UP",
            Self::SignOut(_) => "E_SIGN_OUT",
            Self::NoUser => "E_NO_USER",
            Self::Profile(_) => "E_PROFILE",
            Self::ProfileUpdate(_) => "E_PROFILE_UPDATE",
            Self::NotSignedIn => "E_NOT_SIGNED_IN",
        }
    }
}

/// Snapshot of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthState {
    pub user: UserProfile,
    /// Always `user.id.is_some()`.
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub last_error: Option<StoreError>,
    pub is_backend_configured: bool,
}

impl AuthState {
    #[must_use]
    pub fn new(is_backend_configured: bool) -> Self {
        Self {
            user: UserProfile::default(),
            is_authenticated: false,
            is_loading: false,
            last_error: None,
            is_backend_configured,
        }
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        if self.is_loading {
            AuthPhase::Authenticating
        } else if self.is_authenticated {
            AuthPhase::Authenticated
        } else {
            AuthPhase::Anonymous
        }
    }

    fn set_user(&mut self, user: UserProfile) {
        self.is_authenticated = user.id.is_some();
        self.user = user;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Outcome of a secondary step that must not block the primary action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment<T> {
    Fresh(T),
    Degraded { fallback: T, reason: StoreError },
}

impl<T> Enrichment<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Fresh(value) | Self::Degraded { fallback: value, .. } => value,
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

// =============================================================================
// STORE
// =============================================================================

enum Mode {
    Live,
    Simulated { delay: Duration },
}

pub struct UserStore {
    backend: Arc<dyn AuthBackend>,
    mode: Mode,
    state: watch::Sender<AuthState>,
    op_lock: Mutex<()>,
}

/// Clears `is_loading` when dropped, including on early return or when the
/// action's future is cancelled.
struct LoadingGuard<'a> {
    state: &'a watch::Sender<AuthState>,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a watch::Sender<AuthState>) -> Self {
        state.send_modify(|s| s.is_loading = true);
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.is_loading = false);
    }
}

impl UserStore {
    /// Build a store over `backend`. Simulated mode is chosen when `config`
    /// has no credentials.
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, config: &BackendConfig) -> Self {
        let mode =
            if config.is_configured { Mode::Live } else { Mode::Simulated { delay: config.simulated_delay } };
        let (state, _) = watch::channel(AuthState::new(config.is_configured));
        Self { backend, mode, state, op_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_backend_configured(&self) -> bool {
        matches!(self.mode, Mode::Live)
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn AuthBackend> {
        &self.backend
    }

    // -------------------------------------------------------------------------
    // Direct mutators
    // -------------------------------------------------------------------------

    pub fn set_user(&self, user: UserProfile) {
        self.state.send_modify(|s| s.set_user(user));
    }

    pub fn clear_user(&self) {
        self.set_user(UserProfile::default());
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.state.send_modify(|s| s.is_loading = is_loading);
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the sign-in failure, which is also stored in `last_error`.
    /// A missing profile row is not an error.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), StoreError> {
        let _op = self.op_lock.lock().await;
        let _loading = LoadingGuard::start(&self.state);
        self.clear_error();

        let delay = match self.mode {
            Mode::Live => return self.login_live(email, password).await,
            Mode::Simulated { delay } => delay,
        };
        tokio::time::sleep(delay).await;
        self.set_user(UserProfile::derived(SIMULATED_USER_ID, email));
        tracing::info!(%email, "simulated sign in");
        Ok(())
    }

    /// Create an account and its profile row.
    ///
    /// # Errors
    ///
    /// Returns the sign-up failure, which is also stored in `last_error`.
    /// A failed profile insert is logged and otherwise ignored.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<(), StoreError> {
        let _op = self.op_lock.lock().await;
        let _loading = LoadingGuard::start(&self.state);
        self.clear_error();

        let delay = match self.mode {
            Mode::Live => return self.register_live(email, password, name).await,
            Mode::Simulated { delay } => delay,
        };
        tokio::time::sleep(delay).await;
        self.set_user(UserProfile::new(SIMULATED_USER_ID, name, email, None));
        tracing::info!(%email, "simulated sign up");
        Ok(())
    }

    /// Sign out. Local user state is cleared whether or not the backend
    /// call succeeds.
    ///
    /// # Errors
    ///
    /// Returns the sign-out failure, which is also stored in `last_error`.
    pub async fn logout(&self) -> Result<(), StoreError> {
        let _op = self.op_lock.lock().await;
        let _loading = LoadingGuard::start(&self.state);
        self.clear_error();

        let result = match self.mode {
            Mode::Live => self
                .backend
                .sign_out()
                .await
                .map_err(|e| StoreError::SignOut(e.to_string())),
            Mode::Simulated { .. } => Ok(()),
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "sign out failed; clearing local user anyway");
            self.fail(e.clone());
        }
        self.clear_user();
        result
    }

    /// Restore the user of an existing backend session at cold start.
    /// Failures are logged only and never reach `last_error`.
    pub async fn initialize(&self) {
        let _op = self.op_lock.lock().await;
        let _loading = LoadingGuard::start(&self.state);

        if !matches!(self.mode, Mode::Live) {
            return;
        }

        let user = match self.backend.get_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("no existing session");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "session restore failed");
                return;
            }
        };

        let email = user.email.clone().unwrap_or_default();
        let profile = settle(self.load_profile(&user.id, &email).await);
        tracing::info!(user_id = %user.id, "session restored");
        self.set_user(profile);
    }

    /// Change the signed-in user's display name or avatar.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::NotSignedIn`] without a user, or with the
    /// row update failure. Both are stored in `last_error`.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<(), StoreError> {
        let _op = self.op_lock.lock().await;
        let _loading = LoadingGuard::start(&self.state);
        self.clear_error();

        let id = self.state.borrow().user.id.clone();
        let Some(id) = id else {
            self.fail(StoreError::NotSignedIn);
            return Err(StoreError::NotSignedIn);
        };
        if patch.is_empty() {
            return Ok(());
        }

        if matches!(self.mode, Mode::Live) {
            if let Err(e) = profile::update_profile(self.backend.as_ref(), &id, &patch).await {
                let err = StoreError::ProfileUpdate(e.to_string());
                tracing::warn!(user_id = %id, error = %err, "profile update failed");
                self.fail(err.clone());
                return Err(err);
            }
        }

        self.state.send_modify(|s| {
            if let Some(name) = patch.name {
                s.user.name = Some(name);
            }
            if let Some(avatar) = patch.avatar_url {
                s.user.avatar = Some(avatar);
            }
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Live paths
    // -------------------------------------------------------------------------

    async fn login_live(&self, email: &str, password: &str) -> Result<(), StoreError> {
        let response = self.backend.sign_in_with_password(email, password).await;
        let user = self.primary_user(response, StoreError::SignIn)?;

        let email = user.email.as_deref().unwrap_or(email);
        let profile = settle(self.load_profile(&user.id, email).await);
        tracing::info!(user_id = %user.id, "signed in");
        self.set_user(profile);
        Ok(())
    }

    async fn register_live(&self, email: &str, password: &str, name: &str) -> Result<(), StoreError> {
        let response = self.backend.sign_up(email, password).await;
        let user = self.primary_user(response, StoreError::SignUp)?;

        let profile = settle(self.persist_profile(&user.id, name, email).await);
        tracing::info!(user_id = %user.id, "signed up");
        self.set_user(profile);
        Ok(())
    }

    /// Unwrap the user from a sign-in or sign-up call, recording failures.
    fn primary_user(
        &self,
        response: Result<AuthResponse, BackendError>,
        wrap: fn(String) -> StoreError,
    ) -> Result<BackendUser, StoreError> {
        let result = match response {
            Ok(AuthResponse { user: Some(user), .. }) => Ok(user),
            Ok(_) => Err(StoreError::NoUser),
            Err(e) => Err(wrap(e.to_string())),
        };
        result.inspect_err(|e| {
            tracing::warn!(error = %e, "authentication failed");
            self.fail(e.clone());
        })
    }

    async fn load_profile(&self, id: &str, email: &str) -> Enrichment<UserProfile> {
        let fallback = UserProfile::derived(id, email);
        match profile::fetch_profile(self.backend.as_ref(), id).await {
            Ok(Some(row)) => Enrichment::Fresh(UserProfile {
                id: Some(id.to_owned()),
                name: row.name.or(fallback.name),
                email: Some(email.to_owned()),
                avatar: row.avatar_url,
            }),
            Ok(None) => Enrichment::Degraded { fallback, reason: StoreError::Profile("no profile row".into()) },
            Err(e) => Enrichment::Degraded { fallback, reason: StoreError::Profile(e.to_string()) },
        }
    }

    async fn persist_profile(&self, id: &str, name: &str, email: &str) -> Enrichment<UserProfile> {
        let user = UserProfile::new(id, name, email, None);
        let row = profile::new_profile_row(id, name, email);
        match profile::insert_profile(self.backend.as_ref(), &row).await {
            Ok(()) => Enrichment::Fresh(user),
            Err(e) => Enrichment::Degraded { fallback: user, reason: StoreError::Profile(e.to_string()) },
        }
    }

    fn fail(&self, err: StoreError) {
        self.state.send_modify(|s| s.last_error = Some(err));
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }
}

/// Log a degraded enrichment and keep going with its fallback.
fn settle(enrichment: Enrichment<UserProfile>) -> UserProfile {
    if let Enrichment::Degraded { reason, fallback } = &enrichment {
        tracing::warn!(user_id = ?fallback.id, error = %reason, "profile degraded; using fallback");
    }
    enrichment.into_inner()
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
