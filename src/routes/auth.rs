use axum::routing::post;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/jwt/login", post(handlers::login))
        .route("/auth/jwt/logout", post(handlers::logout))
        .route("/auth/register", post(handlers::register))
        .route("/auth/forgot-password", post(handlers::forgot_password))
        .route("/auth/reset-password", post(handlers::reset_password))
        .route(
            "/auth/request-verify-token",
            post(handlers::request_verify_token),
        )
        .route("/auth/verify", post(handlers::verify))
}
