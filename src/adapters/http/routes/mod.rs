pub mod auth;
pub mod credits;
pub mod sso;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(credits::router())
        .merge(sso::router())
}
