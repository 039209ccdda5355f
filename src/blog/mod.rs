pub mod content;
mod dto;
pub mod handlers;
pub mod repo;
pub mod services;
pub mod slug;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::public_routes().merge(handlers::admin_routes())
}
