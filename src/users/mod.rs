mod dto;
pub mod handlers;
mod password;
mod services;

pub use services::Directory;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
