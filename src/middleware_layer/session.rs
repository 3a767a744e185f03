use std::sync::Arc;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tokio::sync::Mutex;
use tower_cookies::{Cookie, Cookies};
use tower_cookies::cookie::{SameSite, time::Duration};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::session::{FlashKind, FlashMessages, SessionData, SessionRecord},
    state::AppState,
};

/// The name of the signed session cookie.
pub const SESSION_COOKIE: &str = "sid";

struct SessionState {
    data: SessionData,
    dirty: bool,
}

/// The current request's session, as seen by handlers.
///
/// Only flash messages live in the session. Writes mark the session dirty so
/// the middleware persists it once the handler is done.
#[derive(Clone)]
pub struct FlashSession {
    inner: Arc<Mutex<SessionState>>,
}

impl FlashSession {
    fn new(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState { data, dirty: false })),
        }
    }

    /// Queues `message` for the next page render.
    pub async fn flash(&self, kind: FlashKind, message: impl Into<String>) {
        let mut state = self.inner.lock().await;
        state.data.flash.set(kind, message.into());
        state.dirty = true;
    }

    /// Reads and clears the pending flash messages.
    pub async fn take_flash(&self) -> FlashMessages {
        let mut state = self.inner.lock().await;
        if state.data.flash.is_empty() {
            return FlashMessages::default();
        }
        state.dirty = true;
        state.data.flash.take()
    }

    async fn take_if_dirty(&self) -> Option<SessionData> {
        let mut state = self.inner.lock().await;
        if !state.dirty {
            return None;
        }
        state.dirty = false;
        Some(state.data.clone())
    }
}

impl<S> FromRequestParts<S> for FlashSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<FlashSession>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))
    }
}

/// Creates the session cookie for `session_id`.
fn session_cookie(session_id: Uuid, config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());

    cookie.set_http_only(true);
    if config.is_production() {
        cookie.set_secure(true);
    }
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::seconds(config.session_ttl_seconds));
    cookie.set_path("/");

    cookie
}

/// A middleware that loads the session behind the signed `sid` cookie, hands
/// it to handlers as a [`FlashSession`], and stores it again if they changed it.
///
/// Missing, tampered or expired cookies start a fresh session. A session left
/// empty by a handler is deleted along with its cookie.
pub async fn load_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let signed = cookies.signed(&state.cookie_key);

    let existing = signed
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    let (session_id, data) = match existing {
        Some(id) => match state.sessions.load(&id).await? {
            Some(record) => {
                tracing::debug!("🔑 Loaded session: {}", id);
                (id, record.data)
            }
            None => {
                tracing::debug!("Session {} not found or expired, starting a new one", id);
                (Uuid::new_v4(), SessionData::default())
            }
        },
        None => (Uuid::new_v4(), SessionData::default()),
    };

    let session = FlashSession::new(data);
    request.extensions_mut().insert(session.clone());

    let response = next.run(request).await;

    let Some(data) = session.take_if_dirty().await else {
        return Ok(response);
    };

    if data == SessionData::default() {
        state.sessions.delete(&session_id).await?;
        let mut removal = Cookie::new(SESSION_COOKIE, "");
        removal.set_path("/");
        signed.remove(removal);
        tracing::debug!("🧹 Emptied session removed: {}", session_id);
    } else {
        let record = SessionRecord {
            data,
            expires_at: Utc::now() + chrono::Duration::seconds(state.config.session_ttl_seconds),
        };
        state.sessions.save(&session_id, &record).await?;
        signed.add(session_cookie(session_id, &state.config));
        tracing::debug!("✅ Session saved: {}", session_id);
    }

    Ok(response)
}
