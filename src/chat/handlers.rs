use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{auth::extractors::AuthUser, error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct ChatTokenResponse {
    pub token: String,
}

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat/token", get(get_chat_token))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_chat_token(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ChatTokenResponse>, AppError> {
    let token = state.chat.create_token(&user.id.to_string())?;
    info!("chat token issued");
    Ok(Json(ChatTokenResponse { token }))
}
