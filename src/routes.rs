use std::any::Any;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{handlers, middleware_layer, state::AppState};

/// Form bodies here are a few short fields.
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Turns a handler panic into a generic 500.
fn catch_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "<unknown>".to_string()
    };
    tracing::error!("❌ Handler panicked: {}", detail);

    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::users::home))
        .route("/register-user", post(handlers::users::register_user))
        .route("/user-detail/{id}", get(handlers::users::user_detail))
        .route("/delete-user/{id}", post(handlers::users::delete_user))
        .layer(from_fn_with_state(
            state.clone(),
            middleware_layer::session::load_session,
        ))
        .layer(CookieManagerLayer::new())
        .layer(CatchPanicLayer::custom(catch_panic))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .with_state(state)
}
