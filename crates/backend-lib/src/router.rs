// ============================
// authgate-backend/src/router.rs
// ============================
//! HTTP routes.
use crate::handlers::user;
use crate::middleware::{rate_limit, require_auth};
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// Every `/api` route passes the rate limiter first; `/api/auth/*` routes
/// additionally require a valid bearer access token.
pub fn create_router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/user/register", post(user::register))
        .route("/user/login", post(user::login))
        .route("/user/refresh", post(user::refresh))
        .route("/user/forgot-password", post(user::forgot_password))
        .route("/user/reset-password", post(user::reset_password));

    let protected = Router::new()
        .route("/auth/logout", post(user::logout))
        .route(
            "/auth/profile",
            get(user::get_profile).put(user::update_profile),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let api = public
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .nest("/api", api)
        .route("/health", get(user::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
