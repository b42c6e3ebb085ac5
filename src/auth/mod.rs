use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod credentials;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
mod repo;
pub mod repo_types;

pub use claims::Role;
pub use extractors::AuthContext;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
        .merge(handlers::admin_routes())
}
