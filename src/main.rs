use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod routes;
mod state;
mod views;

mod models {
    pub mod session;
    pub mod user;
}

mod repositories {
    pub mod session;
    pub mod user;
}

mod services {
    pub mod users;
}

mod handlers {
    pub mod users;
}

mod middleware_layer {
    pub mod session;
}

mod validation {
    pub mod users;
}

#[cfg(test)]
mod test_support;

use config::Config;
use state::AppState;

/// How often expired sessions are swept from the store.
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!(
        "✅ Configuration loaded ({:?}, {:?} sessions)",
        config.environment,
        config.session_backend
    );

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let app = routes::router(state.clone());

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(SESSION_CLEANUP_INTERVAL).await;
            match sessions.purge_expired().await {
                Ok(purged) => {
                    tracing::info!("🧹 Purged {} expired sessions", purged);
                }
                Err(e) => {
                    tracing::error!("❌ Session cleanup failed: {}", e);
                }
            }
        }
    });

    let addr: SocketAddr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Web application can be accessed at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
