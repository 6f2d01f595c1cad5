use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::repo_types::{User, UserSummary},
    state::AppState,
    users::repo_types::{FriendRequest, FriendRequestStatus, FriendRequestView},
};

pub const SEARCH_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("You can't send a friend request to yourself")]
    SelfRequest,
    #[error("Recipient not found")]
    RecipientNotFound,
    #[error("You are already friends with this user")]
    AlreadyFriends,
    #[error("A friend request already exists between you and this user")]
    RequestExists,
    #[error("Friend request not found")]
    NotFound,
    #[error("You are not authorized to accept this request")]
    Forbidden,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub async fn send_request(
    st: &AppState,
    sender: &User,
    recipient_id: Uuid,
) -> Result<FriendRequest, RelationshipError> {
    if sender.id == recipient_id {
        return Err(RelationshipError::SelfRequest);
    }
    if st.users.find_by_id(recipient_id).await?.is_none() {
        return Err(RelationshipError::RecipientNotFound);
    }
    if sender.is_friend_of(recipient_id) {
        return Err(RelationshipError::AlreadyFriends);
    }
    if st
        .requests
        .find_between(sender.id, recipient_id)
        .await?
        .is_some()
    {
        return Err(RelationshipError::RequestExists);
    }

    // The store rejects a concurrent duplicate that slipped past the check above.
    let req = st
        .requests
        .insert_pending(sender.id, recipient_id)
        .await?
        .ok_or_else(|| {
            warn!(sender_id = %sender.id, %recipient_id, "lost friend request insert race");
            RelationshipError::RequestExists
        })?;

    info!(request_id = %req.id, sender_id = %sender.id, %recipient_id, "friend request sent");
    Ok(req)
}

/// Accepting twice is allowed; the friend sets are only ever added to.
pub async fn accept_request(
    st: &AppState,
    request_id: Uuid,
    acting_user_id: Uuid,
) -> Result<FriendRequest, RelationshipError> {
    let req = st
        .requests
        .find(request_id)
        .await?
        .ok_or(RelationshipError::NotFound)?;
    if req.recipient_id != acting_user_id {
        warn!(%request_id, %acting_user_id, "accept by non-recipient");
        return Err(RelationshipError::Forbidden);
    }

    let req = st
        .requests
        .accept(request_id)
        .await?
        .ok_or(RelationshipError::NotFound)?;
    info!(%request_id, sender_id = %req.sender_id, recipient_id = %req.recipient_id, "friend request accepted");
    Ok(req)
}

pub async fn list_incoming(
    st: &AppState,
    user_id: Uuid,
) -> Result<Vec<FriendRequestView>, RelationshipError> {
    let reqs = st
        .requests
        .list_by_recipient(user_id, FriendRequestStatus::Pending)
        .await?;
    Ok(with_profiles(st, reqs).await?)
}

pub async fn list_outgoing(
    st: &AppState,
    user_id: Uuid,
) -> Result<Vec<FriendRequestView>, RelationshipError> {
    let reqs = st
        .requests
        .list_by_sender(user_id, FriendRequestStatus::Pending)
        .await?;
    Ok(with_profiles(st, reqs).await?)
}

/// Requests this user sent that were accepted. Requests the user accepted
/// from others are not included.
pub async fn list_accepted_sent_by_me(
    st: &AppState,
    user_id: Uuid,
) -> Result<Vec<FriendRequestView>, RelationshipError> {
    let reqs = st
        .requests
        .list_by_sender(user_id, FriendRequestStatus::Accepted)
        .await?;
    Ok(with_profiles(st, reqs).await?)
}

pub async fn list_friends(
    st: &AppState,
    user_id: Uuid,
) -> Result<Vec<UserSummary>, RelationshipError> {
    // Reload: the caller's copy may predate an accept in this same session.
    let Some(user) = st.users.find_by_id(user_id).await? else {
        return Ok(Vec::new());
    };
    let friends = st.users.find_many(&user.friends).await?;
    Ok(friends.iter().map(UserSummary::from).collect())
}

pub async fn recommend(st: &AppState, user: &User) -> Result<Vec<User>, RelationshipError> {
    Ok(st.users.list_recommended(user.id, &user.friends).await?)
}

pub async fn search(
    st: &AppState,
    user_id: Uuid,
    text: &str,
) -> Result<Vec<User>, RelationshipError> {
    let needle = text.trim();
    if needle.is_empty() {
        return Err(RelationshipError::InvalidInput(
            "Search query is required".into(),
        ));
    }
    Ok(st.users.search(user_id, needle, SEARCH_LIMIT).await?)
}

async fn with_profiles(
    st: &AppState,
    reqs: Vec<FriendRequest>,
) -> anyhow::Result<Vec<FriendRequestView>> {
    let mut ids: Vec<Uuid> = reqs
        .iter()
        .flat_map(|r| [r.sender_id, r.recipient_id])
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let profiles: HashMap<Uuid, UserSummary> = st
        .users
        .find_many(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UserSummary::from(u)))
        .collect();

    Ok(reqs
        .into_iter()
        .filter_map(|r| {
            Some(FriendRequestView {
                id: r.id,
                sender: profiles.get(&r.sender_id)?.clone(),
                recipient: profiles.get(&r.recipient_id)?.clone(),
                status: r.status,
                created_at: r.created_at,
            })
        })
        .collect())
}
