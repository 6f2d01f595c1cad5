use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileUpdate, User, USER_COLUMNS};

/// Persistence of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Lookup by an already normalized email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Returns `None` when the email is already registered.
    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>>;

    /// Applies the update and marks the user onboarded. `None` if the user is gone.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate)
        -> anyhow::Result<Option<User>>;

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>>;

    /// Onboarded users other than `user_id` and not in `exclude`.
    async fn list_recommended(&self, user_id: Uuid, exclude: &[Uuid])
        -> anyhow::Result<Vec<User>>;

    /// Case-insensitive substring match on name or email, never returning `user_id`.
    async fn search(&self, user_id: Uuid, needle: &str, limit: i64) -> anyhow::Result<Vec<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Escapes `%`, `_` and `\` so user text matches literally inside ILIKE.
pub(crate) fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            INSERT INTO users (email, full_name, password_hash, profile_pic)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.full_name)
            .bind(&user.password_hash)
            .bind(&user.profile_pic)
            .fetch_optional(&self.db)
            .await
            .context("insert user")?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET full_name         = COALESCE($2, full_name),
                   bio               = COALESCE($3, bio),
                   native_language   = COALESCE($4, native_language),
                   learning_language = COALESCE($5, learning_language),
                   location          = COALESCE($6, location),
                   profile_pic       = COALESCE($7, profile_pic),
                   is_onboarded      = TRUE,
                   updated_at        = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(update.full_name)
            .bind(update.bio)
            .bind(update.native_language)
            .bind(update.learning_language)
            .bind(update.location)
            .bind(update.profile_pic)
            .fetch_optional(&self.db)
            .await
            .context("update profile")?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await
            .context("find users by ids")?;
        Ok(users)
    }

    async fn list_recommended(
        &self,
        user_id: Uuid,
        exclude: &[Uuid],
    ) -> anyhow::Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE id <> $1
               AND NOT (id = ANY($2))
               AND is_onboarded
             ORDER BY created_at DESC
            "#
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(exclude)
            .fetch_all(&self.db)
            .await
            .context("list recommended users")?;
        Ok(users)
    }

    async fn search(&self, user_id: Uuid, needle: &str, limit: i64) -> anyhow::Result<Vec<User>> {
        let pattern = format!("%{}%", escape_like(needle));
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE id <> $1
               AND (full_name ILIKE $2 OR email ILIKE $2)
             ORDER BY full_name ASC
             LIMIT $3
            "#
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.db)
            .await
            .context("search users")?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_quotes_wildcards() {
        assert_eq!(escape_like("ann"), "ann");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
