use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::{FriendRequest, FriendRequestStatus, REQUEST_COLUMNS};

/// Persistence of friend requests and of the friend edges they produce.
#[async_trait]
pub trait FriendRequestStore: Send + Sync {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<FriendRequest>>;

    /// Any request between `a` and `b`, whichever side sent it.
    async fn find_between(&self, a: Uuid, b: Uuid) -> anyhow::Result<Option<FriendRequest>>;

    /// Inserts a pending request. `None` if the pair already has one; this
    /// check is atomic with the insert.
    async fn insert_pending(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
    ) -> anyhow::Result<Option<FriendRequest>>;

    /// Marks the request accepted and adds each party to the other's friend
    /// set, all or nothing. `None` if the request does not exist.
    async fn accept(&self, id: Uuid) -> anyhow::Result<Option<FriendRequest>>;

    async fn list_by_recipient(
        &self,
        recipient_id: Uuid,
        status: FriendRequestStatus,
    ) -> anyhow::Result<Vec<FriendRequest>>;

    async fn list_by_sender(
        &self,
        sender_id: Uuid,
        status: FriendRequestStatus,
    ) -> anyhow::Result<Vec<FriendRequest>>;
}

#[derive(Clone)]
pub struct PgFriendRequestStore {
    db: PgPool,
}

impl PgFriendRequestStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FriendRequestStore for PgFriendRequestStore {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = $1");
        let req = sqlx::query_as::<_, FriendRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find friend request")?;
        Ok(req)
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM friend_requests
             WHERE (sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1)
             LIMIT 1
            "#
        );
        let req = sqlx::query_as::<_, FriendRequest>(&sql)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.db)
            .await
            .context("find friend request between users")?;
        Ok(req)
    }

    async fn insert_pending(
        &self,
        sender_id: Uuid,
        recipient_id: Uuid,
    ) -> anyhow::Result<Option<FriendRequest>> {
        // friend_requests_pair_uniq covers both directions
        let sql = format!(
            r#"
            INSERT INTO friend_requests (sender_id, recipient_id, status)
            VALUES ($1, $2, 'pending')
            ON CONFLICT DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let req = sqlx::query_as::<_, FriendRequest>(&sql)
            .bind(sender_id)
            .bind(recipient_id)
            .fetch_optional(&self.db)
            .await
            .context("insert friend request")?;
        Ok(req)
    }

    async fn accept(&self, id: Uuid) -> anyhow::Result<Option<FriendRequest>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let sql = format!(
            r#"
            UPDATE friend_requests
               SET status = 'accepted', updated_at = now()
             WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        );
        let Some(req) = sqlx::query_as::<_, FriendRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("accept friend request")?
        else {
            tx.rollback().await.context("rollback tx")?;
            return Ok(None);
        };

        for (user_id, friend_id) in [
            (req.sender_id, req.recipient_id),
            (req.recipient_id, req.sender_id),
        ] {
            sqlx::query(
                r#"
                UPDATE users
                   SET friends = array_append(friends, $2), updated_at = now()
                 WHERE id = $1 AND NOT ($2 = ANY(friends))
                "#,
            )
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *tx)
            .await
            .context("add friend")?;
        }

        tx.commit().await.context("commit tx")?;
        Ok(Some(req))
    }

    async fn list_by_recipient(
        &self,
        recipient_id: Uuid,
        status: FriendRequestStatus,
    ) -> anyhow::Result<Vec<FriendRequest>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM friend_requests
             WHERE recipient_id = $1 AND status = $2
             ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, FriendRequest>(&sql)
            .bind(recipient_id)
            .bind(status)
            .fetch_all(&self.db)
            .await
            .context("list friend requests by recipient")?;
        Ok(rows)
    }

    async fn list_by_sender(
        &self,
        sender_id: Uuid,
        status: FriendRequestStatus,
    ) -> anyhow::Result<Vec<FriendRequest>> {
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM friend_requests
             WHERE sender_id = $1 AND status = $2
             ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, FriendRequest>(&sql)
            .bind(sender_id)
            .bind(status)
            .fetch_all(&self.db)
            .await
            .context("list friend requests by sender")?;
        Ok(rows)
    }
}
