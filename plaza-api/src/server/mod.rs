use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use plaza_common::model::{
    Id,
    auth::{AuthTokenDecodeError, AuthTokenHashError},
    credential::CredentialHashError,
    post::PostMarker,
    user::UserMarker,
};
use plaza_db::client::{DbClient, DbError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use validate::ValidationErrors;

mod auth;
mod json;
mod routes;
mod validate;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("The authenticated user is soft-deleted")]
    InactiveUser,
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Credential digest failure: {0}")]
    Credential(#[from] CredentialHashError),
    #[error("Login failed")]
    LoginFailed,
    #[error("Request validation failed")]
    Validation(ValidationErrors),
    #[error("User with id {0} was not found.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Referenced user with id {0} was not found.")]
    TargetUserNotFound(Id<UserMarker>),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(Id<PostMarker>),
    #[error("No permission to {action} the {resource}")]
    Forbidden {
        action: &'static str,
        resource: &'static str,
    },
    #[error("The email address is already in use")]
    EmailTaken,
    #[error("The requester already follows the target user")]
    AlreadyFollowing,
    #[error("The requester does not follow the target user")]
    NotFollowing,
    #[error("A user cannot follow themself")]
    SelfFollow,
    #[error("The user is already deleted")]
    UserAlreadyDeleted,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::UserByIdNotFound(_)
            | ServerError::TargetUserNotFound(_)
            | ServerError::PostByIdNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken
            | ServerError::InactiveUser => StatusCode::UNAUTHORIZED,
            ServerError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ServerError::JsonRejection(_)
            | ServerError::Validation(_)
            | ServerError::LoginFailed
            | ServerError::EmailTaken
            | ServerError::AlreadyFollowing
            | ServerError::NotFollowing
            | ServerError::SelfFollow
            | ServerError::UserAlreadyDeleted => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Credential(_)
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing message. Kept separate from [`std::fmt::Display`],
    /// which is for logs and may carry internals.
    fn detail(&self) -> String {
        match self {
            ServerError::UnknownRoute(_) | ServerError::PathRejection(_) => "Not found.".to_owned(),
            ServerError::JsonRejection(_) => "Malformed request body.".to_owned(),
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                "Authentication credentials were not provided.".to_owned()
            }
            ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::InvalidToken => "Invalid or expired token.".to_owned(),
            ServerError::InactiveUser => "User is inactive or deleted.".to_owned(),
            ServerError::LoginFailed => {
                "No active account found with the given credentials.".to_owned()
            }
            ServerError::UserByIdNotFound(_) => "User not found or has been deleted.".to_owned(),
            ServerError::TargetUserNotFound(_) => "User not found.".to_owned(),
            ServerError::PostByIdNotFound(_) => "Post not found or has been deleted.".to_owned(),
            ServerError::Forbidden { action, resource } => {
                format!("You do not have permission to {action} this {resource}.")
            }
            ServerError::AlreadyFollowing => "You are already following this user.".to_owned(),
            ServerError::NotFollowing => "You are not following this user.".to_owned(),
            ServerError::SelfFollow => "You cannot follow yourself.".to_owned(),
            ServerError::UserAlreadyDeleted => "User already deleted.".to_owned(),
            ServerError::Validation(_) | ServerError::EmailTaken => {
                unreachable!("rendered as a field-keyed body")
            }
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Credential(_)
            | ServerError::AuthTokenHash(_) => "An unexpected error occurred.".to_owned(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct DetailBody {
    detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        match self {
            ServerError::Validation(errors) => (status, Json(errors)).into_response(),
            ServerError::EmailTaken => {
                let mut errors = ValidationErrors::default();
                errors.push("email", "Email already in use".to_owned());
                (status, Json(errors)).into_response()
            }
            other => {
                let body = DetailBody {
                    detail: other.detail(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
