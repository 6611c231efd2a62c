use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod history;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub use password::Passwords;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
