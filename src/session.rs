//! Session monitor: tracks the backend's view of the current session user
//! for views that need the raw auth record rather than the store's profile.
//!
//! When configured it fetches the current user once and then follows
//! auth-state events. Unconfigured monitors settle immediately with no user.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::backend::{AuthBackend, AuthEvent, BackendUser, Session, Subscription};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<BackendUser>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub is_configured: bool,
}

pub struct SessionMonitor {
    state: Arc<watch::Sender<SessionSnapshot>>,
    _subscription: Option<Subscription>,
}

impl SessionMonitor {
    pub async fn start(backend: Arc<dyn AuthBackend>, is_configured: bool) -> Self {
        let initial = SessionSnapshot { is_loading: is_configured, is_configured, ..SessionSnapshot::default() };
        let state = Arc::new(watch::channel(initial).0);

        if !is_configured {
            return Self { state, _subscription: None };
        }

        // Subscribe before fetching so an event that lands mid-fetch is kept.
        // Once an event has arrived, the fetched user is stale and ignored.
        let saw_event = Arc::new(AtomicBool::new(false));
        let sink = state.clone();
        let seen = saw_event.clone();
        let subscription = backend.on_auth_state_change(Arc::new(move |event: AuthEvent, session: Option<&Session>| {
            tracing::debug!(?event, "session monitor update");
            seen.store(true, Ordering::SeqCst);
            let user = session.map(|s| s.user.clone());
            sink.send_modify(|s| s.user = user);
        }));
        // Listener registration may fire synchronously with the current state.
        saw_event.store(false, Ordering::SeqCst);

        match backend.get_user().await {
            Ok(user) if !saw_event.load(Ordering::SeqCst) => state.send_modify(|s| s.user = user),
            Ok(_) => tracing::debug!("auth event arrived during user fetch, keeping it"),
            Err(e) => {
                tracing::warn!(error = %e, "current user fetch failed");
                state.send_modify(|s| s.error = Some(e.to_string()));
            }
        }
        state.send_modify(|s| s.is_loading = false);

        Self { state, _subscription: Some(subscription) }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
