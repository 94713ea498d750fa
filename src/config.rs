use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_PORT: &str = "5000";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "leaf_guard";
const DEFAULT_COLLECTION: &str = "captured_data";

pub struct Config {
    pub port: u16,
    /// `None` leaves request bodies unbounded.
    pub body_limit_bytes: Option<usize>,
    /// Optional; nothing reads it yet.
    pub secret_key: Option<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub mongodb_collection: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests never touch the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let body_limit_bytes = match lookup("BODY_LIMIT_MB") {
            Some(raw) => {
                let mb = parse::<usize>("BODY_LIMIT_MB", &raw)?;
                let bytes = mb.checked_mul(1024 * 1024).ok_or(ConfigError::Invalid {
                    key: "BODY_LIMIT_MB",
                    reason: format!("{mb} MiB does not fit in usize bytes"),
                })?;
                Some(bytes)
            }
            None => None,
        };

        let secret_key = lookup("SECRET_KEY");
        if secret_key.is_none() {
            warn!("SECRET_KEY not set, continuing without one");
        }

        let openai_api_key = lookup("OPENAI_API_KEY")
            .or_else(|| lookup("OPEN_API_KEY"))
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        Ok(Self {
            port: try_load(&lookup, "PORT", DEFAULT_PORT)?,
            body_limit_bytes,
            secret_key,
            openai_api_key,
            openai_model: try_load(&lookup, "OPENAI_MODEL", DEFAULT_MODEL)?,
            openai_base_url: try_load::<String, _>(&lookup, "OPENAI_BASE_URL", DEFAULT_BASE_URL)?
                .trim_end_matches('/')
                .to_string(),
            mongodb_uri: try_load(&lookup, "MONGODB_URI", DEFAULT_MONGODB_URI)?,
            mongodb_database: try_load(&lookup, "MONGODB_DATABASE", DEFAULT_DATABASE)?,
            mongodb_collection: try_load(&lookup, "MONGODB_COLLECTION", DEFAULT_COLLECTION)?,
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    parse(key, &raw)
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let config =
            Config::from_lookup(lookup(&[("SECRET_KEY", "s3cret"), ("OPENAI_API_KEY", "sk-test")]))
                .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.body_limit_bytes, None);
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.mongodb_database, "leaf_guard");
        assert_eq!(config.mongodb_collection, "captured_data");
        assert_eq!(config.secret_key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn legacy_api_key_name_is_accepted() {
        let config =
            Config::from_lookup(lookup(&[("SECRET_KEY", "s"), ("OPEN_API_KEY", "sk-legacy")]))
                .unwrap();

        assert_eq!(config.openai_api_key, "sk-legacy");
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = Config::from_lookup(lookup(&[("SECRET_KEY", "s")])).err().unwrap();

        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));
    }

    #[test]
    fn missing_secret_key_is_tolerated() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "k")])).unwrap();

        assert_eq!(config.secret_key, None);
    }

    #[test]
    fn oversized_body_limit_is_an_error() {
        let huge = usize::MAX.to_string();
        let err = Config::from_lookup(lookup(&[
            ("SECRET_KEY", "s"),
            ("OPENAI_API_KEY", "k"),
            ("BODY_LIMIT_MB", huge.as_str()),
        ]))
        .err()
        .unwrap();

        assert!(matches!(err, ConfigError::Invalid { key: "BODY_LIMIT_MB", .. }));
    }

    #[test]
    fn body_limit_and_port_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("SECRET_KEY", "s"),
            ("OPENAI_API_KEY", "k"),
            ("PORT", "8080"),
            ("BODY_LIMIT_MB", "5"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1/"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.body_limit_bytes, Some(5 * 1024 * 1024));
        assert_eq!(config.openai_base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("SECRET_KEY", "s"),
            ("OPENAI_API_KEY", "k"),
            ("PORT", "99999"),
        ]))
        .err()
        .unwrap();

        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }
}
