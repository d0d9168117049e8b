use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{Id, follow::Follow, user::UserMarker};
use plaza_db::client::{CreateFollowError, DbClient};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(follow_user)
        .typed_delete(unfollow_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/follow/", rejection(ServerError))]
struct FollowPath {
    id: Id<UserMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/unfollow/", rejection(ServerError))]
struct UnfollowPath {
    id: Id<UserMarker>,
}

/// The acting identity is always the follower side, so no ownership gate
/// applies; only self-targeting is rejected.
async fn follow_user(
    FollowPath { id }: FollowPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
) -> Result<(StatusCode, Json<Follow>)> {
    let target = db
        .fetch_user_unfiltered(id)
        .await?
        .ok_or(ServerError::TargetUserNotFound(id))?;

    if requester.user_id() == target.id {
        return Err(ServerError::SelfFollow);
    }

    match db.create_follow(requester.user_id(), target.id).await {
        Ok(follow) => Ok((StatusCode::CREATED, Json(follow))),
        Err(CreateFollowError::AlreadyFollowing) => Err(ServerError::AlreadyFollowing),
        Err(CreateFollowError::Db(err)) => Err(err.into()),
    }
}

async fn unfollow_user(
    UnfollowPath { id }: UnfollowPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
) -> Result<StatusCode> {
    let target = db
        .fetch_user_unfiltered(id)
        .await?
        .ok_or(ServerError::TargetUserNotFound(id))?;

    if db.delete_follow(requester.user_id(), target.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFollowing)
    }
}
