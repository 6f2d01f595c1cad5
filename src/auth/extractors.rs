use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::{
    repo_types::User,
    session::{token_from_headers, SessionKeys},
};
use crate::{error::AppError, state::AppState};

/// The user behind a valid session cookie. Rejects with 401 when the cookie
/// is missing, invalid, expired, or points at a user that no longer exists.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| AppError::Unauthenticated("Unauthorized - Missing Token".into()))?;

        let keys = SessionKeys::from_ref(state);
        let user_id = keys.validate(token).map_err(|e| {
            warn!(error = %e, "invalid or expired session token");
            AppError::Unauthenticated("Unauthorized - Invalid Token".into())
        })?;

        let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
            warn!(user_id = %user_id, "session for missing user");
            AppError::Unauthenticated("Unauthorized - No User".into())
        })?;

        Ok(AuthUser(user))
    }
}

/// `Json<T>` whose rejections (bad syntax, wrong types, missing content type)
/// come back as a 400 with the usual `{"message": ...}` body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
