use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

// =============================================================================
// credentials
// =============================================================================

#[test]
fn both_values_present_is_configured() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", "https://project.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
    ]));
    assert!(cfg.is_configured);
    assert_eq!(cfg.url.as_deref(), Some("https://project.supabase.co"));
    assert_eq!(cfg.key.as_deref(), Some("anon"));
    assert_eq!(cfg.credentials(), Some(("https://project.supabase.co", "anon")));
}

#[test]
fn missing_key_is_unconfigured_with_null_values() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[("SUPABASE_URL", "https://project.supabase.co")]));
    assert!(!cfg.is_configured);
    assert!(cfg.url.is_none());
    assert!(cfg.key.is_none());
    assert!(cfg.credentials().is_none());
}

#[test]
fn empty_values_count_as_absent() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[("SUPABASE_URL", "  "), ("SUPABASE_ANON_KEY", "")]));
    assert!(!cfg.is_configured);
}

#[test]
fn expo_names_are_used_as_fallback() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", ""),
        ("EXPO_PUBLIC_SUPABASE_URL", "https://expo.supabase.co"),
        ("EXPO_PUBLIC_SUPABASE_ANON_KEY", "expo-key"),
    ]));
    assert!(cfg.is_configured);
    assert_eq!(cfg.url.as_deref(), Some("https://expo.supabase.co"));
    assert_eq!(cfg.key.as_deref(), Some("expo-key"));
}

#[test]
fn slash_only_url_does_not_shadow_expo_url() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_URL", " / "),
        ("EXPO_PUBLIC_SUPABASE_URL", "https://expo.supabase.co/"),
        ("SUPABASE_ANON_KEY", "anon"),
    ]));
    assert!(cfg.is_configured);
    assert_eq!(cfg.url.as_deref(), Some("https://expo.supabase.co"));
}

#[test]
fn nothing_set_yields_defaults() {
    let cfg = BackendConfig::from_lookup(|_| None);
    assert_eq!(cfg, BackendConfig::unconfigured());
    assert_eq!(cfg.simulated_delay, Duration::from_millis(DEFAULT_SIMULATED_DELAY_MS));
}

// =============================================================================
// numeric knobs
// =============================================================================

#[test]
fn numeric_overrides_are_parsed() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[
        ("SUPABASE_REQUEST_TIMEOUT_SECS", "42"),
        ("SUPABASE_CONNECT_TIMEOUT_SECS", "7"),
        ("AUTH_SIMULATED_DELAY_MS", "5"),
    ]));
    assert_eq!(cfg.timeouts, BackendTimeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.simulated_delay, Duration::from_millis(5));
}

#[test]
fn invalid_numeric_override_falls_back_to_default() {
    let cfg = BackendConfig::from_lookup(lookup_from(&[("SUPABASE_REQUEST_TIMEOUT_SECS", "soon")]));
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

// =============================================================================
// from_env, the only test in this crate that touches the environment.
// =============================================================================

#[test]
fn from_env_reads_process_environment() {
    unsafe {
        for name in URL_VARS.iter().chain(KEY_VARS.iter()) {
            std::env::remove_var(name);
        }
        std::env::set_var("SUPABASE_URL", "https://env.supabase.co");
        std::env::set_var("SUPABASE_ANON_KEY", "env-key");
    }

    let cfg = BackendConfig::from_env();
    assert!(cfg.is_configured);
    assert_eq!(cfg.url.as_deref(), Some("https://env.supabase.co"));

    unsafe {
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_ANON_KEY");
    }
}
