pub mod dto;
pub mod generator;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::catalog_routes())
        .merge(handlers::weekly_plan_routes())
}
