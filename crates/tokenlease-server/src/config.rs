//! Host configuration.
//!
//! Built from environment variables at startup and injected into Axum
//! handlers via [`axum::extract::State`].

use std::time::Duration;

use crate::lease::LeasePolicy;

/// Global configuration shared across all handlers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (default `8200`).
    pub listen_port: u16,
    /// System lease defaults applied to issued credentials.
    pub lease_policy: LeasePolicy,
}

impl ServerConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable                 | Default | Description                         |
    /// |--------------------------|---------|-------------------------------------|
    /// | `TOKENLEASE_PORT`        | `8200`  | HTTP listen port                    |
    /// | `TOKENLEASE_DEFAULT_TTL` | `3600`  | Lease TTL (s) when a role has none  |
    /// | `TOKENLEASE_MAX_TTL`     | `86400` | Lease ceiling (s) for every lease   |
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        let listen_port = lookup("TOKENLEASE_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8200);

        Self {
            listen_port,
            lease_policy: LeasePolicy {
                default_ttl: Duration::from_secs(number("TOKENLEASE_DEFAULT_TTL", 3600)),
                max_ttl: Duration::from_secs(number("TOKENLEASE_MAX_TTL", 86_400)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = from(&[]);
        assert_eq!(cfg.listen_port, 8200);
        assert_eq!(cfg.lease_policy.default_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.lease_policy.max_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn overrides() {
        let cfg = from(&[
            ("TOKENLEASE_PORT", "9000"),
            ("TOKENLEASE_DEFAULT_TTL", "60"),
            ("TOKENLEASE_MAX_TTL", "120"),
        ]);
        assert_eq!(cfg.listen_port, 9000);
        assert_eq!(cfg.lease_policy.default_ttl, Duration::from_secs(60));
        assert_eq!(cfg.lease_policy.max_ttl, Duration::from_secs(120));
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let cfg = from(&[("TOKENLEASE_PORT", "http"), ("TOKENLEASE_MAX_TTL", "-1")]);
        assert_eq!(cfg.listen_port, 8200);
        assert_eq!(cfg.lease_policy.max_ttl, Duration::from_secs(86_400));
    }
}
