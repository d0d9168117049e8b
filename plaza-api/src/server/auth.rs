use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use plaza_common::model::{
    Id,
    auth::{AuthToken, TokenKind},
    lifecycle::SoftDeletable,
    user::UserMarker,
};
use plaza_db::client::DbClient;
use std::sync::Arc;
use time::UtcDateTime;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The identity resolved from the request's bearer credential. Extraction
/// fails with 401 before any handler logic runs.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(self) -> Id<UserMarker> {
        self.id
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let db = Arc::<DbClient>::from_ref(state);
        let authentication = db
            .fetch_authentication(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        // The token names a user; the stored grant must agree, and only
        // access tokens are valid on the resource surface.
        if authentication.user != request_token.user_id
            || authentication.kind != TokenKind::Access
        {
            return Err(ServerError::InvalidToken);
        }

        if authentication.is_expired(UtcDateTime::now()) {
            return Err(ServerError::InvalidToken);
        }

        let user = db
            .fetch_user_unfiltered(authentication.user)
            .await?
            .ok_or(ServerError::InvalidToken)?;
        if !user.is_visible() {
            return Err(ServerError::InactiveUser);
        }

        Ok(Self {
            id: authentication.user,
        })
    }
}
