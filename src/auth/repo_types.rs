use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub full_name: String,
    pub bio: String,
    pub profile_pic: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub is_onboarded: bool,
    pub friends: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_friend_of(&self, other: Uuid) -> bool {
        self.friends.contains(&other)
    }
}

/// Columns selected whenever a full `User` row is loaded.
pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, full_name, bio, profile_pic, \
     native_language, learning_language, location, is_onboarded, friends, created_at, updated_at";

/// Fields required to insert a user; the email is already normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub profile_pic: String,
}

/// Partial onboarding update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub native_language: Option<String>,
    pub learning_language: Option<String>,
    pub location: Option<String>,
    pub profile_pic: Option<String>,
}

/// Public profile shown next to friend requests and in friend lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub profile_pic: String,
    pub native_language: String,
    pub learning_language: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name.clone(),
            profile_pic: u.profile_pic.clone(),
            native_language: u.native_language.clone(),
            learning_language: u.learning_language.clone(),
        }
    }
}
