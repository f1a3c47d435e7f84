//! Backend configuration resolved from environment variables.
//!
//! DESIGN
//! ======
//! Resolution never fails. Missing or empty credentials produce an
//! unconfigured result and the rest of the crate runs in mock mode. The
//! pure form, [`BackendConfig::from_lookup`], takes a lookup closure so
//! tests do not need to touch the process environment.

use std::time::Duration;

pub const URL_VARS: [&str; 2] = ["SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL"];
pub const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "EXPO_PUBLIC_SUPABASE_ANON_KEY"];

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for BackendTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub is_configured: bool,
    pub timeouts: BackendTimeouts,
    /// Delay applied by the store's simulated actions in mock mode.
    pub simulated_delay: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::unconfigured()
    }
}

impl BackendConfig {
    /// Build config from the process environment.
    ///
    /// Credentials:
    /// - `SUPABASE_URL` (or `EXPO_PUBLIC_SUPABASE_URL`)
    /// - `SUPABASE_ANON_KEY` (or `EXPO_PUBLIC_SUPABASE_ANON_KEY`)
    ///
    /// Optional:
    /// - `SUPABASE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SUPABASE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `AUTH_SIMULATED_DELAY_MS`: default 1000
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build config from an arbitrary lookup function.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = first_non_empty(&lookup, &URL_VARS, strip_trailing_slash);
        let key = first_non_empty(&lookup, &KEY_VARS, str::trim);
        let is_configured = url.is_some() && key.is_some();

        let timeouts = BackendTimeouts {
            request_secs: parse_u64(&lookup, "SUPABASE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "SUPABASE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let simulated_delay =
            Duration::from_millis(parse_u64(&lookup, "AUTH_SIMULATED_DELAY_MS", DEFAULT_SIMULATED_DELAY_MS));

        if is_configured {
            Self { url, key, is_configured, timeouts, simulated_delay }
        } else {
            Self { timeouts, simulated_delay, ..Self::unconfigured() }
        }
    }

    /// Config with no credentials and default knobs.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            url: None,
            key: None,
            is_configured: false,
            timeouts: BackendTimeouts::default(),
            simulated_delay: Duration::from_millis(DEFAULT_SIMULATED_DELAY_MS),
        }
    }

    /// Return the URL and key pair when both are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if !self.is_configured {
            return None;
        }
        Some((self.url.as_deref()?, self.key.as_deref()?))
    }
}

/// First variable whose value is non-empty once trimmed and normalized.
fn first_non_empty<F>(lookup: &F, names: &[&str], normalize: fn(&str) -> &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .map(|v| normalize(v.trim()).to_string())
        .find(|v| !v.is_empty())
}

fn strip_trailing_slash(value: &str) -> &str {
    value.trim_end_matches('/')
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .inspect_err(|error| {
                tracing::warn!(%key, %value, %error, "invalid numeric override, using default");
            })
            .unwrap_or(default),
        None => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
