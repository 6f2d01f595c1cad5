use axum::{
    extract::{FromRef, State},
    http::{header, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, LogoutResponse, SignupRequest},
        extractors::{AuthUser, JsonBody},
        repo_types::ProfileUpdate,
        services::{authenticate, signup, update_profile},
        session::SessionKeys,
    },
    error::AppError,
    state::AppState,
};

type WithCookie<T> = (StatusCode, [(header::HeaderName, HeaderValue); 1], Json<T>);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/onboarding", post(onboard))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup_handler(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<WithCookie<AuthResponse>, AppError> {
    let user = signup(&state, &payload.full_name, &payload.email, &payload.password).await?;

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.cookie(&keys.issue(user.id)?)?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::new(user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<WithCookie<AuthResponse>, AppError> {
    let user = authenticate(&state, &payload.email, &payload.password).await?;

    let keys = SessionKeys::from_ref(&state);
    let cookie = keys.cookie(&keys.issue(user.id)?)?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse::new(user)),
    ))
}

/// Drops the cookie only; the token itself stays valid until it expires.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<WithCookie<LogoutResponse>, AppError> {
    let keys = SessionKeys::from_ref(&state);
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, keys.clear_cookie()?)],
        Json(LogoutResponse {
            success: true,
            message: "Logout successful",
        }),
    ))
}

#[instrument(skip(user), fields(user_id = %user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<AuthResponse> {
    Json(AuthResponse::new(user))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn onboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(payload): JsonBody<ProfileUpdate>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = update_profile(&state, user.id, payload).await?;
    Ok(Json(AuthResponse::new(user)))
}
