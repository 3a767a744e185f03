use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

/// Fallback signing secret for local development only.
const DEV_SESSION_SECRET: &str = "roster-development-session-secret";

/// The environment the application runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("Unknown APP_ENV '{}' (expected development or production)", other),
        }
    }
}

/// Where sessions (and their flash messages) are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionBackend {
    Memory,
    Postgres,
    Redis,
}

impl FromStr for SessionBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            other => anyhow::bail!("Unknown SESSION_STORE '{}' (expected memory, postgres or redis)", other),
        }
    }
}

/// Connection parameters for the PostgreSQL database.
#[derive(Clone)]
pub struct DatabaseSettings {
    /// A full connection URL. Takes precedence over the split fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub dbname: Option<String>,
    /// The maximum number of pooled connections.
    pub max_connections: usize,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Development or production.
    pub environment: Environment,
    /// The database connection parameters.
    pub database: DatabaseSettings,
    /// The session storage backend.
    pub session_backend: SessionBackend,
    /// The secret used to sign the session cookie.
    pub session_secret: Zeroizing<String>,
    /// The lifetime of a session in seconds.
    pub session_ttl_seconds: i64,
    /// The URL of the Redis server, used by the redis session backend.
    pub redis_url: String,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment: Environment = lookup("APP_ENV")
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or(Environment::Development);

        let session_secret = match lookup("SESSION_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => Zeroizing::new(secret),
            None if environment == Environment::Production => {
                anyhow::bail!("SESSION_SECRET must be set in production");
            }
            None => {
                tracing::warn!("⚠️ SESSION_SECRET not set, using the development fallback");
                Zeroizing::new(DEV_SESSION_SECRET.to_string())
            }
        };

        let session_backend = match lookup("SESSION_STORE") {
            Some(value) => value.parse()?,
            None if environment == Environment::Production => SessionBackend::Postgres,
            None => SessionBackend::Memory,
        };

        if environment == Environment::Production && session_backend == SessionBackend::Memory {
            tracing::warn!("⚠️ In-memory sessions in production are lost on restart");
        }

        let session_ttl_seconds: i64 = lookup("SESSION_TTL_SECONDS")
            .unwrap_or_else(|| "3600".to_string())
            .parse()
            .context("Invalid SESSION_TTL_SECONDS")?;
        if session_ttl_seconds <= 0 {
            anyhow::bail!("SESSION_TTL_SECONDS must be positive");
        }

        let database = DatabaseSettings {
            url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: lookup("DB_PORT")
                .unwrap_or_else(|| "5432".to_string())
                .parse()
                .context("Invalid DB_PORT")?,
            user: lookup("DB_USER"),
            password: lookup("DB_PASSWORD").map(Zeroizing::new),
            dbname: lookup("DB_DATABASE"),
            max_connections: lookup("DB_MAX")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("Invalid DB_MAX")?,
        };
        if database.max_connections == 0 {
            anyhow::bail!("DB_MAX must be at least 1");
        }

        Ok(Self {
            bind_addr: lookup("BIND_ADDR")
                .unwrap_or_else(|| "127.0.0.1:3000".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            environment,
            database,
            session_backend,
            session_secret,
            session_ttl_seconds,
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
        })
    }

    /// Whether the application runs in production.
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn development_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.session_backend, SessionBackend::Memory);
        assert_eq!(config.session_ttl_seconds, 3600);
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.session_secret.as_str(), DEV_SESSION_SECRET);
        assert!(!config.is_production());
    }

    #[test]
    fn production_requires_a_session_secret() {
        assert!(config_from(&[("APP_ENV", "production")]).is_err());
    }

    #[test]
    fn production_defaults_to_postgres_sessions() {
        let config = config_from(&[
            ("APP_ENV", "production"),
            ("SESSION_SECRET", "a-long-and-random-secret"),
        ])
        .unwrap();

        assert_eq!(config.session_backend, SessionBackend::Postgres);
        assert!(config.is_production());
    }

    #[test]
    fn explicit_session_store_wins() {
        let config = config_from(&[("SESSION_STORE", "redis")]).unwrap();
        assert_eq!(config.session_backend, SessionBackend::Redis);
    }

    #[test]
    fn split_database_fields_are_read() {
        let config = config_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_USER", "roster"),
            ("DB_PASSWORD", "hunter22"),
            ("DB_DATABASE", "roster_dev"),
            ("DB_MAX", "4"),
        ])
        .unwrap();

        assert_eq!(config.database.url, None);
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.user.as_deref(), Some("roster"));
        assert_eq!(config.database.dbname.as_deref(), Some("roster_dev"));
        assert_eq!(config.database.max_connections, 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[("APP_ENV", "staging")]).is_err());
        assert!(config_from(&[("SESSION_STORE", "cookie")]).is_err());
        assert!(config_from(&[("SESSION_TTL_SECONDS", "0")]).is_err());
        assert!(config_from(&[("DB_MAX", "many")]).is_err());
        assert!(config_from(&[("BIND_ADDR", "localhost")]).is_err());
    }
}
