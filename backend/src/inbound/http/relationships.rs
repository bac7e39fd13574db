//! Relationship API handlers.
//!
//! ```text
//! POST   /api/v1/users/me/followings {"userId":"..."}
//! DELETE /api/v1/users/me/followings/{userId}
//! POST   /api/v1/users/me/groups {"groupId":"..."}
//! DELETE /api/v1/users/me/groups/{groupId}
//! ```
//!
//! Every handler acts on the signed-in user and returns the refreshed user
//! document, so clients see both their new `followings` and `myGroups`.

use actix_web::{delete, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SignedIn;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_group_id, parse_user_id};

const USER_ID: FieldName = FieldName::new("userId");
const GROUP_ID: FieldName = FieldName::new("groupId");

/// Request body for `POST /api/v1/users/me/followings`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FollowRequest {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub user_id: String,
}

/// Request body for `POST /api/v1/users/me/groups`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JoinGroupRequest {
    #[schema(example = "7c9e6679-7425-40de-944b-e07fc1f90ae7")]
    pub group_id: String,
}

/// Follow another user.
#[utoipa::path(
    post,
    path = "/api/v1/users/me/followings",
    request_body = FollowRequest,
    responses(
        (status = 200, description = "Now following", body = User),
        (status = 400, description = "Malformed id or self-follow", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 503, description = "Store unavailable", body = Error),
        (status = 504, description = "Store timed out", body = Error)
    ),
    tags = ["relationships"],
    operation_id = "follow"
)]
#[post("/users/me/followings")]
pub async fn follow(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    payload: web::Json<FollowRequest>,
) -> ApiResult<web::Json<User>> {
    let target = parse_user_id(&payload.user_id, USER_ID)?;
    let user = state.relationships.follow(&actor, &target).await?;
    Ok(web::Json(user))
}

/// Stop following a user. Succeeds when no edge existed.
#[utoipa::path(
    delete,
    path = "/api/v1/users/me/followings/{userId}",
    params(("userId" = String, Path, description = "Followed user id (UUID)")),
    responses(
        (status = 200, description = "No longer following", body = User),
        (status = 400, description = "Malformed id or self-unfollow", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 504, description = "Store timed out", body = Error)
    ),
    tags = ["relationships"],
    operation_id = "unfollow"
)]
#[delete("/users/me/followings/{user_id}")]
pub async fn unfollow(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let target = parse_user_id(&path, USER_ID)?;
    let user = state.relationships.unfollow(&actor, &target).await?;
    Ok(web::Json(user))
}

/// Join a group.
#[utoipa::path(
    post,
    path = "/api/v1/users/me/groups",
    request_body = JoinGroupRequest,
    responses(
        (status = 200, description = "Joined", body = User),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown group", body = Error),
        (status = 504, description = "Store timed out", body = Error)
    ),
    tags = ["relationships"],
    operation_id = "joinGroup"
)]
#[post("/users/me/groups")]
pub async fn join_group(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    payload: web::Json<JoinGroupRequest>,
) -> ApiResult<web::Json<User>> {
    let group = parse_group_id(&payload.group_id, GROUP_ID)?;
    let user = state.relationships.join_group(&actor, &group).await?;
    Ok(web::Json(user))
}

/// Leave a group. Succeeds when the user was not a member.
#[utoipa::path(
    delete,
    path = "/api/v1/users/me/groups/{groupId}",
    params(("groupId" = String, Path, description = "Group id (UUID)")),
    responses(
        (status = 200, description = "Left", body = User),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown group", body = Error),
        (status = 504, description = "Store timed out", body = Error)
    ),
    tags = ["relationships"],
    operation_id = "leaveGroup"
)]
#[delete("/users/me/groups/{group_id}")]
pub async fn leave_group(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let group = parse_group_id(&path, GROUP_ID)?;
    let user = state.relationships.leave_group(&actor, &group).await?;
    Ok(web::Json(user))
}

#[cfg(test)]
#[path = "relationships_tests.rs"]
mod tests;
