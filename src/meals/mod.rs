pub mod dto;
pub mod handlers;
pub mod model;
pub mod prompt;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::generate_routes())
}
