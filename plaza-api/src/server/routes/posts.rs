use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    validate::{ValidationErrors, double_option, optional, require},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{
    Id,
    gate::{ResourceOp, authorize},
    post::{ImageUrl, NewPost, PartialPost, Post, PostBody, PostChanges, PostMarker, PostTitle},
};
use plaza_db::client::DbClient;
use serde::Deserialize;
use std::sync::Arc;

const TITLE_REQUIRED: &str = "The title field is required. Please provide a title for the post.";
const CONTENT_REQUIRED: &str = "The content field is required. Please provide the post content.";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_patch(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/", rejection(ServerError))]
struct CreatePostPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct CreatePostRequest {
    title: Option<String>,
    content: Option<String>,
    image_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct UpdatePostRequest {
    title: Option<String>,
    content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    image_url: Option<Option<String>>,
}

fn validate_create(request: CreatePostRequest) -> Result<NewPost> {
    let mut errors = ValidationErrors::default();

    let title = require(
        &mut errors,
        "title",
        TITLE_REQUIRED,
        request.title.map(PostTitle::new),
    );
    let content = require(
        &mut errors,
        "content",
        CONTENT_REQUIRED,
        request.content.map(PostBody::new),
    );
    let image_url = optional(
        &mut errors,
        "image_url",
        request
            .image_url
            .filter(|url| !url.is_empty())
            .map(ImageUrl::new),
    );

    match (title, content) {
        (Some(title), Some(content)) if errors.is_empty() => Ok(NewPost {
            title,
            content,
            image_url,
        }),
        _ => Err(ServerError::Validation(errors)),
    }
}

fn validate_changes(request: UpdatePostRequest) -> Result<PostChanges> {
    let mut errors = ValidationErrors::default();

    let title = optional(&mut errors, "title", request.title.map(PostTitle::new));
    let content = optional(&mut errors, "content", request.content.map(PostBody::new));

    // A provided-but-null (or empty) image URL clears the stored value.
    let image_url = match request.image_url {
        None => None,
        Some(None) => Some(None),
        Some(Some(url)) if url.is_empty() => Some(None),
        Some(Some(url)) => optional(&mut errors, "image_url", Some(ImageUrl::new(url))).map(Some),
    };
    errors.finish()?;

    Ok(PostChanges {
        title,
        content,
        image_url,
    })
}

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PartialPost>)> {
    let new_post = validate_create(request)?;

    let post = db.create_post(requester.user_id(), &new_post).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    _requester: AuthenticatedUser,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !authorize(requester.user_id(), &post, ResourceOp::Edit).is_allowed() {
        return Err(ServerError::Forbidden {
            action: "edit",
            resource: "post",
        });
    }

    let changes = validate_changes(request)?;

    let post = db
        .update_post(id, &changes)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
) -> Result<StatusCode> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if !authorize(requester.user_id(), &post, ResourceOp::Delete).is_allowed() {
        return Err(ServerError::Forbidden {
            action: "delete",
            resource: "post",
        });
    }

    db.soft_delete_post(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
