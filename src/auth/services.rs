use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        password::{check_policy, hash_password, verify_password, PasswordError},
        repo_types::{NewUser, ProfileUpdate, User},
    },
    chat::directory::mirror_user,
    state::AppState,
};

const AVATAR_BASE_URL: &str = "https://avatar.iran.liara.run/username";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Email already in use. Please register with a different email")]
    DuplicateEmail,
    /// Same error for an unknown email and a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<PasswordError> for CredentialError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::TooShort => CredentialError::InvalidInput(e.to_string()),
            other => CredentialError::Store(other.into()),
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Generated initials avatar used until the user picks one.
pub(crate) fn default_avatar(full_name: &str) -> String {
    reqwest::Url::parse_with_params(AVATAR_BASE_URL, &[("username", full_name)])
        .map(String::from)
        .unwrap_or_default()
}

pub async fn signup(
    st: &AppState,
    full_name: &str,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let full_name = full_name.trim();
    let email = normalize_email(email);

    if full_name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(CredentialError::InvalidInput(
            "Please fill out all required fields".into(),
        ));
    }
    check_policy(password)?;
    if !is_valid_email(&email) {
        warn!("signup rejected: invalid email format");
        return Err(CredentialError::InvalidInput("Email format is invalid".into()));
    }
    if let Some(existing) = st.users.find_by_email(&email).await? {
        warn!(user_id = %existing.id, "signup rejected: email already registered");
        return Err(CredentialError::DuplicateEmail);
    }

    let password_hash = hash_password(password)?;
    let new_user = NewUser {
        email,
        full_name: full_name.to_string(),
        password_hash,
        profile_pic: default_avatar(full_name),
    };
    // A concurrent signup can still win the unique constraint.
    let user = st
        .users
        .insert(new_user)
        .await?
        .ok_or(CredentialError::DuplicateEmail)?;

    mirror_user(st.chat.as_ref(), &user).await;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub async fn authenticate(
    st: &AppState,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(CredentialError::InvalidInput(
            "Please fill out all required fields".into(),
        ));
    }

    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!("login rejected: unknown email");
        return Err(CredentialError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(CredentialError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Onboarding: applies whatever fields were sent and marks the user onboarded.
pub async fn update_profile(
    st: &AppState,
    user_id: Uuid,
    update: ProfileUpdate,
) -> Result<User, CredentialError> {
    let user = st
        .users
        .update_profile(user_id, update)
        .await?
        .ok_or(CredentialError::UserNotFound)?;

    mirror_user(st.chat.as_ref(), &user).await;
    info!(user_id = %user.id, "user onboarded");
    Ok(user)
}
