use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::Json,
    validate::{REQUIRED, ValidationErrors, optional, require},
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use plaza_common::model::{
    Id,
    credential::{Password, PasswordDigest},
    gate::{ResourceOp, authorize},
    lifecycle::SoftDeletable,
    post::Post,
    user::{EmailAddress, NewUser, User, UserChanges, UserMarker, UserName},
};
use plaza_db::client::{CreateUserError, DbClient, UpdateUserError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register_user)
        .typed_get(get_user)
        .typed_patch(update_user)
        .typed_delete(delete_user)
        .typed_get(get_user_posts)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/", rejection(ServerError))]
struct RegisterUserPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/", rejection(ServerError))]
struct UserPath {
    id: Id<UserMarker>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/posts/", rejection(ServerError))]
struct UserPostsPath {
    id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct RegisterUserRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct RegisterUserResponse {
    message: &'static str,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

fn validate_register(
    request: RegisterUserRequest,
) -> Result<(UserName, EmailAddress, Password)> {
    let mut errors = ValidationErrors::default();

    let name = require(&mut errors, "name", REQUIRED, request.name.map(UserName::new));
    let email = require(
        &mut errors,
        "email",
        REQUIRED,
        request.email.map(EmailAddress::new),
    );
    let password = require(
        &mut errors,
        "password",
        REQUIRED,
        request.password.map(Password::new),
    );

    match (name, email, password) {
        (Some(name), Some(email), Some(password)) if errors.is_empty() => {
            Ok((name, email, password))
        }
        _ => Err(ServerError::Validation(errors)),
    }
}

fn validate_update(request: UpdateUserRequest) -> Result<UserChanges> {
    let mut errors = ValidationErrors::default();

    let name = optional(&mut errors, "name", request.name.map(UserName::new));
    let email = optional(&mut errors, "email", request.email.map(EmailAddress::new));
    let password = optional(&mut errors, "password", request.password.map(Password::new));
    errors.finish()?;

    let digest = password
        .as_ref()
        .map(PasswordDigest::digest)
        .transpose()?;

    Ok(UserChanges {
        name,
        email,
        digest,
    })
}

async fn register_user(
    RegisterUserPath(): RegisterUserPath,
    State(db): State<Arc<DbClient>>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<RegisterUserResponse>)> {
    let (name, email, password) = validate_register(request)?;
    let digest = PasswordDigest::digest(&password)?;

    let new_user = NewUser {
        name,
        email,
        digest,
    };
    match db.create_user(&new_user).await {
        Ok(_) => Ok((
            StatusCode::CREATED,
            Json(RegisterUserResponse {
                message: "User created successfully!",
            }),
        )),
        Err(CreateUserError::EmailTaken) => Err(ServerError::EmailTaken),
        Err(CreateUserError::Db(err)) => Err(err.into()),
    }
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    _requester: AuthenticatedUser,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(user))
}

async fn update_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    if !authorize(requester.user_id(), &user, ResourceOp::Edit).is_allowed() {
        return Err(ServerError::Forbidden {
            action: "edit",
            resource: "profile",
        });
    }

    let changes = validate_update(request)?;

    match db.update_user(id, &changes).await {
        Ok(Some(user)) => Ok(Json(user)),
        Ok(None) => Err(ServerError::UserByIdNotFound(id)),
        Err(UpdateUserError::EmailTaken) => Err(ServerError::EmailTaken),
        Err(UpdateUserError::Db(err)) => Err(err.into()),
    }
}

async fn delete_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    requester: AuthenticatedUser,
) -> Result<StatusCode> {
    let user = db
        .fetch_user(id)
        .await?
        .ok_or(ServerError::UserByIdNotFound(id))?;

    if !authorize(requester.user_id(), &user, ResourceOp::Delete).is_allowed() {
        return Err(ServerError::Forbidden {
            action: "delete",
            resource: "profile",
        });
    }

    if !user.is_visible() {
        return Err(ServerError::UserAlreadyDeleted);
    }

    db.soft_delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn get_user_posts(
    UserPostsPath { id }: UserPostsPath,
    State(db): State<Arc<DbClient>>,
    _requester: AuthenticatedUser,
) -> Result<Json<Vec<Post>>> {
    let posts = db
        .fetch_user_posts(id)
        .await?
        .ok_or(ServerError::TargetUserNotFound(id))?;

    Ok(Json(posts))
}
