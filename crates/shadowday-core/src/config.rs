// Copyright (C) 2025 Shadowday Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

/// Shadowday core configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL, or `memory` for the in-memory backend
    pub database_url: String,
    /// Default page size for listings when the request carries no limit
    pub default_page_limit: u32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SHADOWDAY_DATABASE_URL`: SQLite connection string, or `memory`
    ///
    /// Optional (with defaults):
    /// - `SHADOWDAY_PAGE_LIMIT`: default listing page size (default: 50)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("SHADOWDAY_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("SHADOWDAY_DATABASE_URL"))?;

        let default_page_limit: u32 = std::env::var("SHADOWDAY_PAGE_LIMIT")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("SHADOWDAY_PAGE_LIMIT", "must be a positive integer"))?;

        if default_page_limit == 0 {
            return Err(ConfigError::Invalid(
                "SHADOWDAY_PAGE_LIMIT",
                "must be a positive integer",
            ));
        }

        Ok(Self {
            database_url,
            default_page_limit,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set env vars for a test and restore them after
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("SHADOWDAY_DATABASE_URL", "sqlite:.data/test.db");
        guard.remove("SHADOWDAY_PAGE_LIMIT");

        let config = Config::from_env().unwrap();
        assert_eq!(config.database_url, "sqlite:.data/test.db");
        assert_eq!(config.default_page_limit, 50);
    }

    #[test]
    fn test_config_custom_page_limit() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("SHADOWDAY_DATABASE_URL", "memory");
        guard.set("SHADOWDAY_PAGE_LIMIT", "100");

        let config = Config::from_env().unwrap();
        assert_eq!(config.default_page_limit, 100);
    }

    #[test]
    fn test_config_missing_database_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.remove("SHADOWDAY_DATABASE_URL");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SHADOWDAY_DATABASE_URL")));
        assert!(err.to_string().contains("SHADOWDAY_DATABASE_URL"));
    }

    #[test]
    fn test_config_invalid_page_limit() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::new();

        guard.set("SHADOWDAY_DATABASE_URL", "memory");
        guard.set("SHADOWDAY_PAGE_LIMIT", "not_a_number");
        assert!(Config::from_env().is_err());

        guard.set("SHADOWDAY_PAGE_LIMIT", "0");
        assert!(Config::from_env().is_err());
    }
}
