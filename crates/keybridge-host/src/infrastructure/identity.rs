//! Host and user identity for the session header.

use keybridge_core::SessionHeader;
use tracing::warn;

/// Environment variables consulted for the login user, in order.
const USER_VARS: [&str; 3] = ["USER", "USERNAME", "LOGNAME"];

const UNKNOWN: &str = "unknown";

/// The machine's host name, or `"unknown"`.
pub fn host_name() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("could not read host name: {e}");
            UNKNOWN.to_string()
        }
    }
}

/// The invoking user's login name, or `"unknown"`.
pub fn login_user() -> String {
    user_from(|var| std::env::var(var).ok())
}

fn user_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    USER_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Builds the header for this host and user.
pub fn session_header() -> SessionHeader {
    SessionHeader::new(host_name(), login_user())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_user_prefers_user_variable() {
        let vars = env(&[("USER", "alice"), ("USERNAME", "ALICE-PC")]);
        assert_eq!(user_from(|k| vars.get(k).cloned()), "alice");
    }

    #[test]
    fn test_user_falls_back_to_windows_username() {
        let vars = env(&[("USER", "  "), ("USERNAME", "bob")]);
        assert_eq!(user_from(|k| vars.get(k).cloned()), "bob");
    }

    #[test]
    fn test_user_defaults_to_unknown() {
        assert_eq!(user_from(|_| None), "unknown");
    }

    #[test]
    fn test_host_name_is_never_empty() {
        assert!(!host_name().is_empty());
    }
}
