use std::{env, fmt::Display, fs::read_to_string, net::SocketAddr, str::FromStr};

use crate::{error::ConfigError, DEFAULT_SESSION_LIFETIME_HOURS, MAX_PAGE_SIZE, RECIPE_COUNT_PER_PAGE};

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub session_lifetime_hours: i64,
    pub page_size: i64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), read_secret)
    }

    /// `var` resolves environment variables, `secret` resolves files under
    /// `/run/secrets`.
    pub fn from_lookup(
        var: impl Fn(&str) -> Option<String>,
        secret: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let jwt_secret = var("JWT_SECRET")
            .or_else(|| secret("JWT_SECRET"))
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::new("JWT_SECRET is not set"))?;

        let page_size: i64 = try_load(&var, "PAGE_SIZE", RECIPE_COUNT_PER_PAGE)?;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::new(&format!(
                "PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        Ok(Self {
            bind_address: try_load(&var, "BIND_ADDRESS", SocketAddr::from(([127, 0, 0, 1], 8000)))?,
            database_url: optional(&var, "DATABASE_URL"),
            database_max_connections: try_load(&var, "DATABASE_MAX_CONNECTIONS", 5)?,
            redis_url: optional(&var, "REDIS_URL"),
            jwt_secret,
            session_lifetime_hours: try_load(
                &var,
                "SESSION_LIFETIME_HOURS",
                DEFAULT_SESSION_LIFETIME_HOURS,
            )?,
            page_size,
        })
    }
}

fn optional(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    let value = var(key).filter(|v| !v.is_empty());
    if value.is_none() {
        log::info!("{key} not set");
    }
    value
}

fn try_load<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value.trim().parse().map_err(|e| {
            log::warn!("Invalid {key} value: {e}");
            ConfigError::new(&format!("invalid {key}"))
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            log::warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")]), |_| None)
            .expect("valid configuration");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8000");
        assert_eq!(config.database_url, None);
        assert_eq!(config.page_size, RECIPE_COUNT_PER_PAGE);
        assert_eq!(config.session_lifetime_hours, DEFAULT_SESSION_LIFETIME_HOURS);
    }

    #[test]
    fn secret_file_backs_missing_variable() {
        let config = Config::from_lookup(lookup(&[]), |name| {
            (name == "JWT_SECRET").then(|| String::from("from-file"))
        })
        .expect("valid configuration");

        assert_eq!(config.jwt_secret, "from-file");
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(Config::from_lookup(lookup(&[]), |_| None).is_err());
        assert!(Config::from_lookup(
            lookup(&[("JWT_SECRET", "s"), ("DATABASE_MAX_CONNECTIONS", "many")]),
            |_| None
        )
        .is_err());
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("PAGE_SIZE", "0")]), |_| None).is_err());
    }
}
