//! Server configuration

use std::str::FromStr;

/// Server configuration loaded from environment variables
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Static API key; authentication is disabled when unset
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    /// Prefix of newly assigned UHIDs
    pub uhid_prefix: String,
}

pub const DEFAULT_RATE_LIMIT_RPS: u32 = 100;
pub const DEFAULT_UHID_PREFIX: &str = "UH";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = lookup("API_KEY").filter(|k| !k.trim().is_empty());

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let rate_limit_rps = parse_or(&lookup, "RATE_LIMIT_RPS", DEFAULT_RATE_LIMIT_RPS)
            .max(1);

        let uhid_prefix = match lookup("UHID_PREFIX") {
            Some(prefix) if hims_core::Uhid::check_prefix(&prefix).is_ok() => prefix,
            Some(prefix) => {
                tracing::warn!(value = %prefix, "Invalid UHID_PREFIX, using default");
                DEFAULT_UHID_PREFIX.to_string()
            }
            None => DEFAULT_UHID_PREFIX.to_string(),
        };

        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "host=localhost user=postgres dbname=hims".into()),
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".into()),
            api_key,
            cors_origins,
            rate_limit_rps,
            uhid_prefix,
        }
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid numeric setting, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.cors_origins, vec!["*"]);
        assert_eq!(cfg.rate_limit_rps, DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(cfg.uhid_prefix, "UH");
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("API_KEY", "secret"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("RATE_LIMIT_RPS", "25"),
            ("UHID_PREFIX", "CITY"),
        ]);
        assert_eq!(cfg.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.cors_origins.len(), 2);
        assert_eq!(cfg.rate_limit_rps, 25);
        assert_eq!(cfg.uhid_prefix, "CITY");
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = config(&[
            ("API_KEY", "  "),
            ("RATE_LIMIT_RPS", "fast"),
            ("UHID_PREFIX", "uh1"),
        ]);
        assert_eq!(cfg.api_key, None);
        assert_eq!(cfg.rate_limit_rps, DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(cfg.uhid_prefix, "UH");

        assert_eq!(config(&[("RATE_LIMIT_RPS", "0")]).rate_limit_rps, 1);
    }
}
