//! Raw row shapes and their conversions into domain models.
//!
//! Records keep store-level types (`i64` ids, `PrimitiveDateTime`, digest
//! strings); the `TryFrom` impls re-validate on the way out so a corrupted
//! row surfaces as [`ModelValidationError`] instead of leaking through.

use plaza_common::model::{
    ModelValidationError,
    auth::Authentication,
    credential::PasswordDigest,
    follow::Follow,
    lifecycle::SoftDeletable,
    post::{ImageUrl, PartialPost, Post, PostAuthor, PostBody, PostTitle},
    user::{EmailAddress, User, UserName},
};
use sqlx::FromRow;
use time::{Duration, PrimitiveDateTime, UtcDateTime};

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
    pub deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CredentialRecord {
    pub user_id: i64,
    pub password_digest: String,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct FullPostRecord {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub user_id: i64,
    pub author_name: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
    pub deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct PartialPostRecord {
    pub post_id: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub user_id: i64,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct FollowRecord {
    pub follow_id: i64,
    pub follower_id: i64,
    pub following_id: i64,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_id: i64,
    pub kind: String,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

impl SoftDeletable for UserRecord {
    fn deleted_at(&self) -> Option<UtcDateTime> {
        self.deleted_at.map(PrimitiveDateTime::as_utc)
    }
}

impl SoftDeletable for FullPostRecord {
    fn deleted_at(&self) -> Option<UtcDateTime> {
        self.deleted_at.map(PrimitiveDateTime::as_utc)
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.into(),
            name: UserName::new(value.name)?,
            email: EmailAddress::new(value.email)?,
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
            deleted_at: value.deleted_at.map(PrimitiveDateTime::as_utc),
        })
    }
}

impl From<CredentialRecord> for PasswordDigest {
    fn from(value: CredentialRecord) -> Self {
        PasswordDigest::from_stored(value.password_digest)
    }
}

impl TryFrom<FullPostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: FullPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            title: PostTitle::new(value.title)?,
            content: PostBody::new(value.content)?,
            image_url: value.image_url.map(ImageUrl::new).transpose()?,
            user: PostAuthor {
                id: value.user_id.into(),
                name: UserName::new(value.author_name)?,
            },
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl TryFrom<PartialPostRecord> for PartialPost {
    type Error = ModelValidationError;

    fn try_from(value: PartialPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            title: PostTitle::new(value.title)?,
            content: PostBody::new(value.content)?,
            image_url: value.image_url.map(ImageUrl::new).transpose()?,
            user: value.user_id.into(),
            created_at: value.created_at.as_utc(),
            updated_at: value.updated_at.as_utc(),
        })
    }
}

impl From<FollowRecord> for Follow {
    fn from(value: FollowRecord) -> Self {
        Self {
            id: value.follow_id.into(),
            follower: value.follower_id.into(),
            following: value.following_id.into(),
            created_at: value.created_at.as_utc(),
        }
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: value.user_id.into(),
            kind: value.kind.parse()?,
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}
