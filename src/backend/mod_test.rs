use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counting_callback(counter: &Arc<AtomicUsize>) -> AuthCallback {
    let counter = counter.clone();
    Arc::new(move |_event: AuthEvent, _session: Option<&Session>| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn unconfigured_selects_mock_client() {
    let backend = connect(&BackendConfig::unconfigured());
    let fired = Arc::new(AtomicUsize::new(0));
    let _sub = backend.on_auth_state_change(counting_callback(&fired));
    // Only the mock client fires on registration.
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn configured_selects_hosted_client() {
    let config = BackendConfig::from_lookup(|name| match name {
        "SUPABASE_URL" => Some("https://project.supabase.co".into()),
        "SUPABASE_ANON_KEY" => Some("anon".into()),
        _ => None,
    });
    let backend = connect(&config);
    let fired = Arc::new(AtomicUsize::new(0));
    let _sub = backend.on_auth_state_change(counting_callback(&fired));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(backend.get_user().await.unwrap().is_none());
}

#[test]
fn dropped_subscription_stops_delivery() {
    let listeners = Listeners::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let sub = listeners.register(counting_callback(&fired));
    listeners.emit(AuthEvent::SignedIn, None);
    drop(sub);
    listeners.emit(AuthEvent::SignedOut, None);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(listeners.is_empty());
}

#[test]
fn auth_event_serializes_screaming_case() {
    let json = serde_json::to_string(&AuthEvent::SignedOut).unwrap();
    assert_eq!(json, "\"SIGNED_OUT\"");
}
