use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{auth::repo_types::User, config::ChatConfig};

/// Identity mirrored into the chat provider's user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub image: String,
}

impl From<&User> for ChatUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            name: u.full_name.clone(),
            image: u.profile_pic.clone(),
        }
    }
}

#[async_trait]
pub trait ChatDirectory: Send + Sync {
    async fn upsert_user(&self, user: &ChatUser) -> anyhow::Result<()>;
    /// Token the client SDK uses to connect as `user_id`.
    fn create_token(&self, user_id: &str) -> anyhow::Result<String>;
}

/// Mirrors a user into the chat directory. Lossy: failures are logged and
/// dropped, the local write stands.
pub async fn mirror_user(chat: &dyn ChatDirectory, user: &User) {
    match chat.upsert_user(&ChatUser::from(user)).await {
        Ok(()) => debug!(user_id = %user.id, "chat user mirrored"),
        Err(e) => warn!(user_id = %user.id, error = ?e, "chat user mirror failed"),
    }
}

#[derive(Serialize)]
struct UserTokenClaims<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct ServerTokenClaims {
    server: bool,
}

/// Stream-compatible REST client.
pub struct StreamDirectory {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    signing: EncodingKey,
}

impl StreamDirectory {
    pub fn new(cfg: &ChatConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build chat http client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            signing: EncodingKey::from_secret(cfg.api_secret.as_bytes()),
        })
    }

    fn server_token(&self) -> anyhow::Result<String> {
        let token = encode(
            &Header::default(),
            &ServerTokenClaims { server: true },
            &self.signing,
        )?;
        Ok(token)
    }
}

#[async_trait]
impl ChatDirectory for StreamDirectory {
    async fn upsert_user(&self, user: &ChatUser) -> anyhow::Result<()> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/users", self.base_url),
            &[("api_key", self.api_key.as_str())],
        )
        .context("chat users url")?;
        let mut users = serde_json::Map::new();
        users.insert(user.id.clone(), serde_json::to_value(user)?);
        let body = json!({ "users": users });

        self.http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.server_token()?)
            .header("stream-auth-type", "jwt")
            .json(&body)
            .send()
            .await
            .context("chat upsert_user")?
            .error_for_status()
            .context("chat upsert_user status")?;
        Ok(())
    }

    fn create_token(&self, user_id: &str) -> anyhow::Result<String> {
        let token = encode(
            &Header::default(),
            &UserTokenClaims { user_id },
            &self.signing,
        )
        .context("sign chat token")?;
        Ok(token)
    }
}

/// Records upserts instead of calling out; can be told to fail.
#[cfg(test)]
#[derive(Default)]
pub struct FakeChatDirectory {
    upserted: std::sync::Mutex<Vec<ChatUser>>,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl FakeChatDirectory {
    pub fn upserted(&self) -> Vec<ChatUser> {
        self.upserted.lock().unwrap().clone()
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl ChatDirectory for FakeChatDirectory {
    async fn upsert_user(&self, user: &ChatUser) -> anyhow::Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            anyhow::bail!("chat directory unavailable");
        }
        self.upserted.lock().unwrap().push(user.clone());
        Ok(())
    }

    fn create_token(&self, user_id: &str) -> anyhow::Result<String> {
        Ok(format!("fake-chat-token-{user_id}"))
    }
}
