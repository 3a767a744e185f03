use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts,
};
use tokio_postgres::{NoTls, config::Host};
use crate::config::DatabaseSettings;
use crate::error::{AppError, Result};
use std::time::Duration;

/// The `users` table. The UNIQUE constraint on `email` is what actually
/// prevents two concurrent registrations from sharing an address.
const USERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id       BIGSERIAL PRIMARY KEY,
    name     TEXT NOT NULL,
    email    TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL
)
"#;

/// Creates a new database connection pool.
///
/// # Arguments
///
/// * `settings` - The database connection parameters.
///
/// # Returns
///
/// A `Result` containing the `Pool`.
pub fn create_pool(settings: &DatabaseSettings) -> Result<Pool> {
    let mut cfg = Config::new();

    match &settings.url {
        Some(url) => {
            let pg_config: tokio_postgres::Config = url.parse()?;

            if let Some(Host::Tcp(hostname)) = pg_config.get_hosts().first() {
                cfg.host = Some(hostname.to_string());
            }

            if let Some(port) = pg_config.get_ports().first() {
                cfg.port = Some(*port);
            }

            if let Some(dbname) = pg_config.get_dbname() {
                cfg.dbname = Some(dbname.to_string());
            }

            if let Some(user) = pg_config.get_user() {
                cfg.user = Some(user.to_string());
            }

            if let Some(password) = pg_config.get_password() {
                cfg.password = Some(String::from_utf8_lossy(password).to_string());
            }
        }
        None => {
            cfg.host = Some(settings.host.clone());
            cfg.port = Some(settings.port);
            cfg.user = settings.user.clone();
            cfg.password = settings.password.as_ref().map(|p| p.to_string());
            cfg.dbname = settings.dbname.clone();
        }
    }

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let mut pool_config = PoolConfig::new(settings.max_connections);
    pool_config.timeouts = Timeouts {
        wait: Some(Duration::from_secs(5)),
        create: Some(Duration::from_secs(2)),
        recycle: Some(Duration::from_secs(1)),
    };
    cfg.pool = Some(pool_config);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(AppError::from)
}

/// Creates the `users` table if it does not exist yet.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.batch_execute(USERS_SCHEMA).await?;
    tracing::info!("✅ users table ready");
    Ok(())
}
