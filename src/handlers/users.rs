use axum::{
    extract::{Form, Path, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::{
    error::{AppError, BadRequest, Result},
    middleware_layer::session::FlashSession,
    models::{session::FlashKind, user::RegistrationForm},
    services::users::{self as user_service, Registration},
    state::AppState,
    validation::users::UserIdParam,
    views,
};

const REGISTER_SUCCESS: &str = "Register user account successfully.";
const DELETE_SUCCESS: &str = "Delete user account successfully.";
const USER_NOT_FOUND: &str = "User is not found.";
const INVALID_DELETE_ID: &str = "Can't delete user. User id is wrong.";

/// The registration form body. Missing fields read as empty strings.
#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "verifyPassword")]
    pub verify_password: String,
}

impl From<RegisterRequest> for RegistrationForm {
    fn from(request: RegisterRequest) -> Self {
        RegistrationForm {
            username: request.username,
            email: request.email,
            password: Zeroizing::new(request.password),
            verify_password: Zeroizing::new(request.verify_password),
        }
    }
}

/// `302 Found` back to the home page.
fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// Renders the home page with the pending flash messages and every user.
#[axum::debug_handler]
pub async fn home(
    State(state): State<AppState>,
    session: FlashSession,
) -> Result<Html<String>> {
    let users = user_service::list_users(state.users.as_ref()).await?;
    let flash = session.take_flash().await;

    tracing::debug!("🏠 Home page with {} users", users.len());
    Ok(Html(views::render_home(&flash, &users)))
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register_user(
    State(state): State<AppState>,
    session: FlashSession,
    form: std::result::Result<Form<RegisterRequest>, FormRejection>,
) -> std::result::Result<Response, BadRequest> {
    let Form(payload) = form.map_err(|e| AppError::MalformedRequest(e.body_text()))?;
    tracing::debug!("📝 Register attempt for email: {}", payload.email);

    match user_service::register_user(state.users.as_ref(), payload.into()).await? {
        Registration::Created(id) => {
            tracing::info!("✅ User registered: {}", id);
            session.flash(FlashKind::Success, REGISTER_SUCCESS).await;
        }
        Registration::Rejected(warning) => {
            tracing::info!("❌ Registration rejected: {}", warning);
            session.flash(FlashKind::Warning, warning.to_string()).await;
        }
    }

    Ok(redirect_home())
}

/// Renders a single user's detail page.
#[axum::debug_handler]
pub async fn user_detail(
    State(state): State<AppState>,
    session: FlashSession,
    Path(raw_id): Path<String>,
) -> std::result::Result<Response, BadRequest> {
    let UserIdParam::Valid(id) = UserIdParam::parse(&raw_id) else {
        tracing::debug!("Malformed user id in detail path: {:?}", raw_id);
        session.flash(FlashKind::Warning, USER_NOT_FOUND).await;
        return Ok(redirect_home());
    };

    match user_service::find_user(state.users.as_ref(), id).await? {
        Some(user) => Ok(Html(views::render_user_detail(&user)).into_response()),
        None => {
            tracing::debug!("User {} not found", id);
            session.flash(FlashKind::Warning, USER_NOT_FOUND).await;
            Ok(redirect_home())
        }
    }
}

/// Deletes a user. Succeeds whether or not the user existed.
#[axum::debug_handler]
pub async fn delete_user(
    State(state): State<AppState>,
    session: FlashSession,
    Path(raw_id): Path<String>,
) -> std::result::Result<Response, BadRequest> {
    let UserIdParam::Valid(id) = UserIdParam::parse(&raw_id) else {
        tracing::debug!("Malformed user id in delete path: {:?}", raw_id);
        session.flash(FlashKind::Warning, INVALID_DELETE_ID).await;
        return Ok(redirect_home());
    };

    user_service::delete_user(state.users.as_ref(), id).await?;
    session.flash(FlashKind::Success, DELETE_SUCCESS).await;

    Ok(redirect_home())
}
