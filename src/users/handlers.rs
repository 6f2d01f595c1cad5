use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        extractors::AuthUser,
        repo_types::{User, UserSummary},
    },
    error::AppError,
    state::AppState,
    users::{
        dto::{FriendRequestsResponse, MessageResponse, SearchQuery},
        repo_types::{FriendRequest, FriendRequestView},
        services,
    },
};

pub fn discovery_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(get_recommended_users))
        .route("/users/friends", get(get_my_friends))
        .route("/users/search", get(search_users))
}

pub fn friend_request_routes() -> Router<AppState> {
    Router::new()
        .route("/users/friend-request/:id", post(send_friend_request))
        .route("/users/friend-request/:id/accept", put(accept_friend_request))
        .route("/users/friend-requests", get(get_friend_requests))
        .route(
            "/users/outgoing-friend-requests",
            get(get_outgoing_friend_requests),
        )
}

fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::InvalidInput("Invalid id".into()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_recommended_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(services::recommend(&state, &user).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_my_friends(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(services::list_friends(&state, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn search_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(services::search(&state, user.id, &q.query).await?))
}

#[instrument(skip(state, user, path), fields(user_id = %user.id))]
pub async fn send_friend_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<FriendRequest>), AppError> {
    let recipient_id = path_id(path)?;
    let req = services::send_request(&state, &user, recipient_id).await?;
    Ok((StatusCode::CREATED, Json(req)))
}

#[instrument(skip(state, user, path), fields(user_id = %user.id))]
pub async fn accept_friend_request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let request_id = path_id(path)?;
    services::accept_request(&state, request_id, user.id).await?;
    Ok(Json(MessageResponse {
        message: "Friend request accepted",
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_friend_requests(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<FriendRequestsResponse>, AppError> {
    let incoming_requests = services::list_incoming(&state, user.id).await?;
    let accepted_requests = services::list_accepted_sent_by_me(&state, user.id).await?;
    Ok(Json(FriendRequestsResponse {
        incoming_requests,
        accepted_requests,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_outgoing_friend_requests(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<FriendRequestView>>, AppError> {
    Ok(Json(services::list_outgoing(&state, user.id).await?))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use crate::app::build_app;

    use super::*;

    struct Client {
        app: Router,
    }

    impl Client {
        async fn call(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Response {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(c) = cookie {
                req = req.header(header::COOKIE, c);
            }
            let body = match body {
                Some(v) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            self.app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
        }

        async fn signup(&self, name: &str, email: &str) -> (String, String) {
            let res = self
                .call(
                    Method::POST,
                    "/api/auth/signup",
                    None,
                    Some(json!({"fullName": name, "email": email, "password": "password123"})),
                )
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
            let cookie = res.headers()[header::SET_COOKIE]
                .to_str()
                .unwrap()
                .split(';')
                .next()
                .unwrap()
                .to_string();
            let id = json_of(res).await["user"]["_id"].as_str().unwrap().to_string();
            (id, cookie)
        }
    }

    async fn json_of(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn alice_and_bob_become_friends() {
        let client = Client {
            app: build_app(AppState::fake()),
        };
        let (alice_id, alice) = client.signup("Alice", "alice@example.com").await;
        let (bob_id, bob) = client.signup("Bob", "bob@example.com").await;
        for cookie in [&alice, &bob] {
            let res = client
                .call(
                    Method::POST,
                    "/api/auth/onboarding",
                    Some(cookie),
                    Some(json!({"nativeLanguage": "english", "learningLanguage": "german"})),
                )
                .await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        let recs = json_of(client.call(Method::GET, "/api/users", Some(&alice), None).await).await;
        assert_eq!(recs.as_array().unwrap().len(), 1);
        assert_eq!(recs[0]["_id"], bob_id);

        let res = client
            .call(Method::POST, &format!("/api/users/friend-request/{bob_id}"), Some(&alice), None)
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let req = json_of(res).await;
        assert_eq!(req["status"], "pending");
        let request_id = req["_id"].as_str().unwrap().to_string();

        let res = client
            .call(Method::POST, &format!("/api/users/friend-request/{alice_id}"), Some(&bob), None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let outgoing = json_of(
            client
                .call(Method::GET, "/api/users/outgoing-friend-requests", Some(&alice), None)
                .await,
        )
        .await;
        assert_eq!(outgoing[0]["recipient"]["_id"], bob_id);

        let requests = json_of(
            client
                .call(Method::GET, "/api/users/friend-requests", Some(&bob), None)
                .await,
        )
        .await;
        assert_eq!(requests["incomingRequests"][0]["sender"]["fullName"], "Alice");
        assert_eq!(requests["acceptedRequests"].as_array().unwrap().len(), 0);

        let accept_uri = format!("/api/users/friend-request/{request_id}/accept");
        let res = client.call(Method::PUT, &accept_uri, Some(&alice), None).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        for _ in 0..2 {
            let res = client.call(Method::PUT, &accept_uri, Some(&bob), None).await;
            assert_eq!(res.status(), StatusCode::OK);
        }

        for (cookie, other) in [(&alice, &bob_id), (&bob, &alice_id)] {
            let friends = json_of(
                client
                    .call(Method::GET, "/api/users/friends", Some(cookie), None)
                    .await,
            )
            .await;
            let friends = friends.as_array().unwrap();
            assert_eq!(friends.len(), 1);
            assert_eq!(&friends[0]["_id"], other);
        }

        let accepted = json_of(
            client
                .call(Method::GET, "/api/users/friend-requests", Some(&alice), None)
                .await,
        )
        .await;
        assert_eq!(accepted["acceptedRequests"][0]["recipient"]["_id"], bob_id);

        let recs = json_of(client.call(Method::GET, "/api/users", Some(&alice), None).await).await;
        assert!(recs.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_endpoint_validates_query() {
        let client = Client {
            app: build_app(AppState::fake()),
        };
        let (_, anna) = client.signup("Anna", "anna@example.com").await;
        client.signup("Joanna", "jo@example.com").await;

        let res = client
            .call(Method::GET, "/api/users/search?query=", Some(&anna), None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = client
            .call(Method::GET, "/api/users/search?query=ann", Some(&anna), None)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let hits = json_of(res).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["fullName"], "Joanna");
    }

    #[tokio::test]
    async fn friend_request_errors_are_json() {
        let client = Client {
            app: build_app(AppState::fake()),
        };
        let (alice_id, alice) = client.signup("Alice", "alice@example.com").await;

        let res = client
            .call(Method::POST, "/api/users/friend-request/not-a-uuid", Some(&alice), None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(res).await["message"], "Invalid id");

        let res = client
            .call(Method::POST, &format!("/api/users/friend-request/{alice_id}"), Some(&alice), None)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = client
            .call(
                Method::POST,
                &format!("/api/users/friend-request/{}", Uuid::new_v4()),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(res).await["message"], "Recipient not found");

        let res = client
            .call(
                Method::PUT,
                &format!("/api/users/friend-request/{}/accept", Uuid::new_v4()),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = client.call(Method::GET, "/api/users", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
