//! In-memory stores backing `AppState::fake()`.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, ProfileUpdate, User},
    },
    users::{
        repo::FriendRequestStore,
        repo_types::{FriendRequest, FriendRequestStatus},
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    requests: Vec<FriendRequest>,
}

/// Holds users and requests behind one lock so accepting a request updates
/// both friend sets together.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

/// Onboarded user with a placeholder hash, ready to be stored directly.
pub fn sample_user(full_name: &str, email: &str) -> User {
    let now = OffsetDateTime::now_utc();
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: "$argon2id$placeholder".into(),
        full_name: full_name.to_string(),
        bio: String::new(),
        profile_pic: String::new(),
        native_language: "english".into(),
        learning_language: "spanish".into(),
        location: String::new(),
        is_onboarded: true,
        friends: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

/// True if `r` links `a` and `b`, in either direction.
fn connects(r: &FriendRequest, a: Uuid, b: Uuid) -> bool {
    (r.sender_id == a && r.recipient_id == b) || (r.sender_id == b && r.recipient_id == a)
}

fn sorted_newest_first(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    users
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            bio: String::new(),
            profile_pic: new.profile_pic,
            native_language: String::new(),
            learning_language: String::new(),
            location: String::new(),
            is_onboarded: false,
            friends: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        let fields = [
            (&mut user.full_name, update.full_name),
            (&mut user.bio, update.bio),
            (&mut user.native_language, update.native_language),
            (&mut user.learning_language, update.learning_language),
            (&mut user.location, update.location),
            (&mut user.profile_pic, update.profile_pic),
        ];
        for (slot, value) in fields {
            if let Some(v) = value {
                *slot = v;
            }
        }
        user.is_onboarded = true;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn list_recommended(
        &self,
        user_id: Uuid,
        exclude: &[Uuid],
    ) -> anyhow::Result<Vec<User>> {
        let tables = self.tables.read().await;
        let users = tables
            .users
            .values()
            .filter(|u| u.id != user_id && !exclude.contains(&u.id) && u.is_onboarded)
            .cloned()
            .collect();
        Ok(sorted_newest_first(users))
    }

    async fn search(&self, user_id: Uuid, needle: &str, limit: i64) -> anyhow::Result<Vec<User>> {
        let needle = needle.to_lowercase();
        let tables = self.tables.read().await;
        let mut hits: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.id != user_id)
            .filter(|u| {
                u.full_name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        hits.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(hits)
    }
}

#[async_trait]
impl FriendRequestStore for MemoryStore {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.requests.iter().find(|r| connects(r, a, b)).cloned())
    }

    async fn insert_pending(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
    ) -> anyhow::Result<Option<FriendRequest>> {
        let mut tables = self.tables.write().await;
        if tables
            .requests
            .iter()
            .any(|r| connects(r, sender_id, recipient_id))
        {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        let req = FriendRequest {
            id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.requests.push(req.clone());
        Ok(Some(req))
    }

    async fn accept(&self, id: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let mut tables = self.tables.write().await;
        let Some(req) = tables.requests.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        req.status = FriendRequestStatus::Accepted;
        req.updated_at = OffsetDateTime::now_utc();
        let req = req.clone();

        for (user_id, friend_id) in [
            (req.sender_id, req.recipient_id),
            (req.recipient_id, req.sender_id),
        ] {
            if let Some(user) = tables.users.get_mut(&user_id) {
                if !user.friends.contains(&friend_id) {
                    user.friends.push(friend_id);
                }
            }
        }
        Ok(Some(req))
    }

    async fn list_by_recipient(
        &self,
        recipient_id: Uuid,
        status: FriendRequestStatus,
    ) -> anyhow::Result<Vec<FriendRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .iter()
            .rev()
            .filter(|r| r.recipient_id == recipient_id && r.status == status)
            .cloned()
            .collect())
    }

    async fn list_by_sender(
        &self,
        sender_id: Uuid,
        status: FriendRequestStatus,
    ) -> anyhow::Result<Vec<FriendRequest>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .iter()
            .rev()
            .filter(|r| r.sender_id == sender_id && r.status == status)
            .cloned()
            .collect())
    }
}
