pub mod auth;
pub mod posts;
pub mod users;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble every endpoint into one service.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router(state.config.max_upload_bytes()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
