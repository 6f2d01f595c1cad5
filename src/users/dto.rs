use serde::{Deserialize, Serialize};

use crate::users::repo_types::FriendRequestView;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestsResponse {
    pub incoming_requests: Vec<FriendRequestView>,
    pub accepted_requests: Vec<FriendRequestView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
