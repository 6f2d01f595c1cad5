use crate::state::AppState;
use axum::Router;

pub mod directory;
pub mod handlers;

pub fn router() -> Router<AppState> {
    handlers::chat_routes()
}
