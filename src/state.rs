use std::sync::Arc;
use sha2::{Digest, Sha512};
use tower_cookies::Key;
use crate::config::{Config, SessionBackend};
use crate::error::Result;
use crate::repositories::session::{
    MemorySessionStore, PgSessionStore, RedisSessionStore, SessionStore,
};
use crate::repositories::user::{PgUserRepository, UserRepository};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// User storage.
    pub users: Arc<dyn UserRepository>,
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// The application's configuration.
    pub config: Config,
    /// The key signing the session cookie.
    pub cookie_key: Key,
}

/// Derives the 64-byte cookie signing key from the configured secret.
fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

impl AppState {
    /// Creates a new `AppState`, connecting to the configured backends.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(&config.database)?;
        tracing::info!(
            "✅ PostgreSQL Pool initialized (max {} connections)",
            config.database.max_connections
        );

        crate::db::ensure_schema(&db).await?;

        let sessions: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Memory => {
                tracing::info!("✅ In-memory session store initialized");
                Arc::new(MemorySessionStore::new())
            }
            SessionBackend::Postgres => {
                let store = PgSessionStore::new(db.clone());
                store.ensure_table().await?;
                tracing::info!("✅ PostgreSQL session store initialized");
                Arc::new(store)
            }
            SessionBackend::Redis => {
                let store = RedisSessionStore::connect(&config.redis_url).await?;
                tracing::info!("✅ Redis session store initialized");
                Arc::new(store)
            }
        };

        let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db));

        Ok(Self::from_parts(config.clone(), users, sessions))
    }

    /// Assembles an `AppState` from already-built parts.
    pub fn from_parts(
        config: Config,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let cookie_key = derive_cookie_key(&config.session_secret);
        AppState {
            users,
            sessions,
            config,
            cookie_key,
        }
    }
}
